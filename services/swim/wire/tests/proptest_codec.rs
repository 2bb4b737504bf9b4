//! Property-based tests for the SWIM codec.
//!
//! Encoded records must decode back to the same values, and no strict prefix
//! of an encoded packet may decode.

use proptest::prelude::*;
use std::net::{Ipv4Addr, SocketAddrV4};
use swim_wire::{
    Cursor, FdMsgType, MemberBin, MemberDef, MemberStatus, Packet, PacketBuilder,
};
use uuid::Uuid;

fn status() -> impl Strategy<Value = MemberStatus> {
    prop_oneof![
        Just(MemberStatus::Alive),
        Just(MemberStatus::Dead),
        Just(MemberStatus::Left),
    ]
}

prop_compose! {
    fn member()(
        status in status(),
        ip in 1u32..,
        port in 1u16..,
        uuid in any::<[u8; 16]>().prop_filter("nil uuid", |b| b.iter().any(|&x| x != 0)),
        incarnation in any::<u64>(),
    ) -> MemberDef {
        MemberDef {
            status,
            addr: SocketAddrV4::new(Ipv4Addr::from(ip), port),
            uuid: Uuid::from_bytes(uuid),
            incarnation,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn member_roundtrip(def in member()) {
        let mut bin = MemberBin::new();
        bin.fill(&def);
        let mut cur = Cursor::new(bin.as_bytes());
        let decoded = MemberDef::decode(&mut cur, "test:").unwrap();
        prop_assert!(cur.is_empty());
        prop_assert_eq!(decoded, def);
    }

    #[test]
    fn packet_roundtrip_and_truncation(
        members in prop::collection::vec(member(), 0..8),
        events in prop::collection::vec(member(), 0..4),
        sender in member(),
        ping in any::<bool>(),
        incarnation in any::<u64>(),
    ) {
        let mut builder = PacketBuilder::new(sender.addr, sender.uuid);
        let msg_type = if ping { FdMsgType::Ping } else { FdMsgType::Ack };
        builder.failure_detection(msg_type, incarnation);
        prop_assert_eq!(builder.anti_entropy(&members), members.len());
        prop_assert_eq!(builder.dissemination(&events), events.len());
        let bytes = builder.build().unwrap();

        let packet = Packet::decode(&bytes).unwrap();
        prop_assert_eq!(packet.meta.src, sender.addr);
        prop_assert_eq!(packet.src_uuid, sender.uuid);
        prop_assert_eq!(packet.failure_detection.map(|fd| fd.msg_type), Some(msg_type));
        prop_assert_eq!(packet.failure_detection.map(|fd| fd.incarnation), Some(incarnation));
        prop_assert_eq!(&packet.anti_entropy, &members);
        prop_assert_eq!(&packet.dissemination, &events);

        for len in 0..bytes.len() {
            prop_assert!(Packet::decode(&bytes[..len]).is_err());
        }
    }

    #[test]
    fn arbitrary_input_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = Packet::decode(&data);
        let _ = MemberDef::decode(&mut Cursor::new(&data), "test:");
    }
}
