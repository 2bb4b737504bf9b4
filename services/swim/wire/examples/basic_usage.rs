//! Basic usage example for the SWIM wire codec.

use std::net::{Ipv4Addr, SocketAddrV4};
use swim_wire::{FdMsgType, MemberDef, MemberStatus, Packet, PacketBuilder};
use uuid::Uuid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== SWIM Wire Codec Example ===\n");

    let src = SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 1), 3301);
    let src_uuid = Uuid::new_v4();

    // 1. Build a ping carrying a small anti-entropy batch
    println!("1. Building a PING packet with anti-entropy...");
    let members: Vec<MemberDef> = (2..6u8)
        .map(|i| MemberDef {
            status: if i % 2 == 0 {
                MemberStatus::Alive
            } else {
                MemberStatus::Dead
            },
            addr: SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, i), 3301),
            uuid: Uuid::new_v4(),
            incarnation: u64::from(i),
        })
        .collect();

    let mut builder = PacketBuilder::new(src, src_uuid);
    builder.failure_detection(FdMsgType::Ping, 1);
    let encoded = builder.anti_entropy(&members);
    let packet_bytes = builder.build()?;

    println!("   Members encoded: {}", encoded);
    println!("   Encoded packet size: {} bytes", packet_bytes.len());

    // 2. Decode the packet
    println!("\n2. Decoding the packet...");
    let packet = Packet::decode(&packet_bytes)?;
    println!("   Decoded successfully!");
    println!("   Source: {} ({})", packet.meta.src, packet.src_uuid);
    println!("   Protocol version: 0x{:06X}", packet.meta.version);
    if let Some(fd) = packet.failure_detection {
        println!("   Failure detection: {} (incarnation {})", fd.msg_type, fd.incarnation);
    }
    for member in &packet.anti_entropy {
        println!(
            "   Member {} at {}: {} (incarnation {})",
            member.uuid, member.addr, member.status, member.incarnation
        );
    }

    // 3. Clip a large batch to one UDP packet
    println!("\n3. Clipping a large anti-entropy batch...");
    let many: Vec<MemberDef> = (0..200u16)
        .map(|i| {
            MemberDef::new(
                SocketAddrV4::new(Ipv4Addr::new(10, 0, (i >> 8) as u8, i as u8 | 1), 3301),
                Uuid::new_v4(),
            )
        })
        .collect();
    let mut builder = PacketBuilder::new(src, src_uuid);
    let encoded = builder.anti_entropy(&many);
    println!("   {} of {} members fit in {} bytes", encoded, many.len(), builder.encoded_len());

    // 4. Reject a truncated packet
    println!("\n4. Decoding a truncated packet...");
    match Packet::decode(&packet_bytes[..packet_bytes.len() - 3]) {
        Ok(_) => println!("   Unexpectedly decoded"),
        Err(e) => println!("   Rejected: {}", e),
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
