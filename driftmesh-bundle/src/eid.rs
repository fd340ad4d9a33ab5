use crate::cbor;
use crate::error::CodecError;

/// IPN node number reserved for the all-neighbors broadcast destination.
/// The textual wire constant `"11111111"` is carried here as the numeric
/// endpoint it denotes under the IPN scheme, since every endpoint in a
/// bundle shares one scheme.
pub const BROADCAST_NODE_NUM: u32 = 11_111_111;

/// The scheme shared by every endpoint referenced within one bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Scheme {
    Dtn = 0,
    Ipn = 1,
}

impl TryFrom<u8> for Scheme {
    type Error = CodecError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Scheme::Dtn),
            1 => Ok(Scheme::Ipn),
            v => Err(CodecError::UnknownScheme(v)),
        }
    }
}

/// A scheme-tagged endpoint identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Eid {
    Ipn { node: u32, service: u32 },
    Dtn(String),
}

impl Eid {
    pub fn scheme(&self) -> Scheme {
        match self {
            Eid::Ipn { .. } => Scheme::Ipn,
            Eid::Dtn(_) => Scheme::Dtn,
        }
    }

    /// The broadcast endpoint used by discovery bundles.
    pub fn broadcast() -> Self {
        Eid::Ipn {
            node: BROADCAST_NODE_NUM,
            service: 0,
        }
    }

    /// The IPN node number, if this is an IPN endpoint.
    pub fn node_num(&self) -> Option<u32> {
        match self {
            Eid::Ipn { node, .. } => Some(*node),
            Eid::Dtn(_) => None,
        }
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        match self {
            Eid::Ipn { node, service } => {
                cbor::encode::array(&[cbor::encode::uint(*node as u64), cbor::encode::uint(*service as u64)])
            }
            Eid::Dtn(id) => cbor::encode::text(id),
        }
    }

    pub(crate) fn decode(data: &[u8], scheme: Scheme) -> Result<(Self, usize), CodecError> {
        match scheme {
            Scheme::Ipn => {
                let mut offset = cbor::decode::expect_array(data, 2)?;
                let (node, o) = cbor::decode::expect_uint(&data[offset..])?;
                offset += o;
                let (service, o) = cbor::decode::expect_uint(&data[offset..])?;
                offset += o;
                Ok((
                    Eid::Ipn {
                        node: node as u32,
                        service: service as u32,
                    },
                    offset,
                ))
            }
            Scheme::Dtn => {
                let (text, len) = cbor::decode::expect_text(data)?;
                Ok((Eid::Dtn(text.to_owned()), len))
            }
        }
    }
}

impl std::fmt::Display for Eid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Eid::Ipn { node, service } => write!(f, "ipn:{node}.{service}"),
            Eid::Dtn(id) => write!(f, "dtn:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipn_round_trips() {
        let eid = Eid::Ipn { node: 42, service: 7 };
        let encoded = eid.encode();
        let (decoded, len) = Eid::decode(&encoded, Scheme::Ipn).unwrap();
        assert_eq!(decoded, eid);
        assert_eq!(len, encoded.len());
    }

    #[test]
    fn dtn_round_trips() {
        let eid = Eid::Dtn("node-a".to_owned());
        let encoded = eid.encode();
        let (decoded, len) = Eid::decode(&encoded, Scheme::Dtn).unwrap();
        assert_eq!(decoded, eid);
        assert_eq!(len, encoded.len());
    }

    #[test]
    fn broadcast_is_well_known() {
        assert_eq!(Eid::broadcast().node_num(), Some(BROADCAST_NODE_NUM));
    }
}
