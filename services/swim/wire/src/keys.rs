//! Integer map keys of every SWIM section.
//!
//! Keys are stable wire identifiers. New keys get new values; retired values
//! are never reused.

/// Keys of the packet body map
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKey {
    /// Sender UUID
    SrcUuid = 0,
    /// Anti-entropy member batch
    AntiEntropy = 1,
    /// Failure detection ping/ack
    FailureDetection = 2,
    /// Dissemination event batch
    Dissemination = 3,
    /// Voluntary leave notice
    Quit = 4,
}

impl TryFrom<u64> for BodyKey {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BodyKey::SrcUuid),
            1 => Ok(BodyKey::AntiEntropy),
            2 => Ok(BodyKey::FailureDetection),
            3 => Ok(BodyKey::Dissemination),
            4 => Ok(BodyKey::Quit),
            _ => Err(value),
        }
    }
}

/// Keys of the meta header map
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKey {
    /// Sender protocol version
    Version = 0,
    /// Sender IPv4 address
    SrcAddress = 1,
    /// Sender port
    SrcPort = 2,
}

impl TryFrom<u64> for MetaKey {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MetaKey::Version),
            1 => Ok(MetaKey::SrcAddress),
            2 => Ok(MetaKey::SrcPort),
            _ => Err(value),
        }
    }
}

/// Keys of the failure detection map
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdKey {
    /// Ping or ack
    MsgType = 0,
    /// Sender incarnation
    Incarnation = 1,
}

impl TryFrom<u64> for FdKey {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FdKey::MsgType),
            1 => Ok(FdKey::Incarnation),
            _ => Err(value),
        }
    }
}

/// Keys of a member (passport) map
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKey {
    /// Member status
    Status = 0,
    /// Member IPv4 address
    Address = 1,
    /// Member port
    Port = 2,
    /// Member UUID
    Uuid = 3,
    /// Member incarnation
    Incarnation = 4,
}

impl TryFrom<u64> for MemberKey {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MemberKey::Status),
            1 => Ok(MemberKey::Address),
            2 => Ok(MemberKey::Port),
            3 => Ok(MemberKey::Uuid),
            4 => Ok(MemberKey::Incarnation),
            _ => Err(value),
        }
    }
}

/// Key of the quit map
pub const QUIT_INCARNATION: u8 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_conversion() {
        assert_eq!(BodyKey::try_from(4).unwrap(), BodyKey::Quit);
        assert_eq!(MetaKey::try_from(2).unwrap(), MetaKey::SrcPort);
        assert_eq!(FdKey::try_from(0).unwrap(), FdKey::MsgType);
        assert_eq!(MemberKey::try_from(3).unwrap(), MemberKey::Uuid);
        assert_eq!(MemberKey::try_from(5), Err(5));
        assert_eq!(MetaKey::try_from(99), Err(99));
    }
}
