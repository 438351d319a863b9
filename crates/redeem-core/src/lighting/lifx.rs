//! LIFX LAN protocol client.
//!
//! Only the messages needed here are implemented: `GetService`/`StateService`
//! for discovery and `SetColor` for colour changes. All fields are
//! little-endian; every message starts with a 36-byte header.

use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

use super::{BulbAddresses, BulbSlot, Hsbk, LightController};
use crate::error::{RedeemError, Result};

/// UDP port LIFX devices listen on.
pub const LIFX_PORT: u16 = 56700;

pub const HEADER_LEN: usize = 36;
const PROTOCOL: u16 = 1024;
const ADDRESSABLE: u16 = 1 << 12;
const TAGGED: u16 = 1 << 13;
/// Identifies our packets in replies.
const SOURCE: u32 = 0x5245_4445;

pub const MSG_GET_SERVICE: u16 = 2;
pub const MSG_STATE_SERVICE: u16 = 3;
pub const MSG_SET_COLOR: u16 = 102;

const SERVICE_UDP: u8 = 1;

/// Decoded fields of a message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub size: u16,
    pub tagged: bool,
    pub source: u32,
    pub target: [u8; 6],
    pub sequence: u8,
    pub message_type: u16,
}

/// Encodes a complete message.
///
/// A `None` target is a broadcast and sets the tagged bit.
pub fn encode_message(target: Option<[u8; 6]>, sequence: u8, message_type: u16, payload: &[u8]) -> Vec<u8> {
    let size = (HEADER_LEN + payload.len()) as u16;
    let mut buf = BytesMut::with_capacity(size as usize);

    let mut flags = PROTOCOL | ADDRESSABLE;
    if target.is_none() {
        flags |= TAGGED;
    }
    buf.put_u16_le(size);
    buf.put_u16_le(flags);
    buf.put_u32_le(SOURCE);

    let mut target_bytes = [0u8; 8];
    if let Some(mac) = target {
        target_bytes[..6].copy_from_slice(&mac);
    }
    buf.put_slice(&target_bytes);
    buf.put_bytes(0, 6);
    buf.put_u8(0); // res_required / ack_required off
    buf.put_u8(sequence);

    buf.put_u64_le(0);
    buf.put_u16_le(message_type);
    buf.put_u16_le(0);

    buf.put_slice(payload);
    buf.to_vec()
}

/// Decodes a message header, returning it with the remaining payload.
pub fn decode_header(packet: &[u8]) -> Option<(Header, &[u8])> {
    if packet.len() < HEADER_LEN {
        return None;
    }
    let mut buf = &packet[..HEADER_LEN];
    let size = buf.get_u16_le();
    let flags = buf.get_u16_le();
    let source = buf.get_u32_le();
    let mut target = [0u8; 6];
    buf.copy_to_slice(&mut target);
    buf.advance(2 + 6 + 1);
    let sequence = buf.get_u8();
    buf.advance(8);
    let message_type = buf.get_u16_le();

    if flags & 0x0fff != PROTOCOL || (size as usize) > packet.len() || (size as usize) < HEADER_LEN {
        return None;
    }

    let header = Header {
        size,
        tagged: flags & TAGGED != 0,
        source,
        target,
        sequence,
        message_type,
    };
    Some((header, &packet[HEADER_LEN..size as usize]))
}

/// Payload of a `SetColor` message; `transition` is carried in milliseconds.
pub fn set_color_payload(color: Hsbk, transition: Duration) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(13);
    buf.put_u8(0);
    buf.put_u16_le(color.hue);
    buf.put_u16_le(color.saturation);
    buf.put_u16_le(color.brightness);
    buf.put_u16_le(color.kelvin);
    buf.put_u32_le(transition.as_millis().min(u32::MAX as u128) as u32);
    buf.to_vec()
}

/// Formats a hardware address as `aa:bb:cc:dd:ee:ff`.
pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Parses `aa:bb:cc:dd:ee:ff` (case-insensitive).
pub fn parse_mac(s: &str) -> Option<[u8; 6]> {
    let mut mac = [0u8; 6];
    let mut parts = s.trim().split(':');
    for byte in mac.iter_mut() {
        let part = parts.next()?;
        if part.len() != 2 {
            return None;
        }
        *byte = u8::from_str_radix(part, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}

/// A bulb found on the local network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifxBulb {
    pub mac: [u8; 6],
    pub addr: SocketAddr,
}

impl LifxBulb {
    pub fn mac_address(&self) -> String {
        format_mac(&self.mac)
    }
}

fn parse_state_service(packet: &[u8], from: SocketAddr) -> Option<LifxBulb> {
    let (header, mut payload) = decode_header(packet)?;
    if header.message_type != MSG_STATE_SERVICE || payload.len() < 5 {
        return None;
    }
    let service = payload.get_u8();
    let port = payload.get_u32_le();
    if service != SERVICE_UDP || port == 0 || port > u16::MAX as u32 {
        return None;
    }
    Some(LifxBulb {
        mac: header.target,
        addr: SocketAddr::new(from.ip(), port as u16),
    })
}

/// Broadcasts `GetService` and collects replies until `timeout` elapses.
pub async fn discover(timeout: Duration) -> Result<Vec<LifxBulb>> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(|e| RedeemError::Discovery(format!("bind failed: {}", e)))?;
    socket
        .set_broadcast(true)
        .map_err(|e| RedeemError::Discovery(format!("enable broadcast failed: {}", e)))?;

    let probe = encode_message(None, 0, MSG_GET_SERVICE, &[]);
    socket
        .send_to(&probe, (Ipv4Addr::BROADCAST, LIFX_PORT))
        .await
        .map_err(|e| RedeemError::Discovery(format!("broadcast failed: {}", e)))?;

    let mut found: HashMap<[u8; 6], LifxBulb> = HashMap::new();
    let deadline = tokio::time::Instant::now() + timeout;
    let mut buf = [0u8; 512];

    loop {
        let recv = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await;
        match recv {
            Err(_) => break,
            Ok(Ok((len, from))) => {
                if let Some(bulb) = parse_state_service(&buf[..len], from) {
                    tracing::debug!("Found bulb {} at {}", bulb.mac_address(), bulb.addr);
                    found.entry(bulb.mac).or_insert(bulb);
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Discovery receive failed: {}", e);
            }
        }
    }

    Ok(found.into_values().collect())
}

/// The two configured bulbs, resolved once at startup and read-only thereafter.
pub struct LifxLights {
    socket: UdpSocket,
    bulbs: [LifxBulb; 2],
}

impl LifxLights {
    /// Picks the configured bulbs out of a discovery scan.
    pub async fn resolve(found: &[LifxBulb], addresses: &BulbAddresses) -> Result<Self> {
        let bed = find_bulb(found, &addresses.bed)?;
        let ceiling = find_bulb(found, &addresses.ceiling)?;

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(|e| RedeemError::Lighting(format!("bind failed: {}", e)))?;

        Ok(Self {
            socket,
            bulbs: [bed, ceiling],
        })
    }

    pub fn bulb(&self, slot: BulbSlot) -> &LifxBulb {
        &self.bulbs[slot.index()]
    }
}

fn find_bulb(found: &[LifxBulb], address: &str) -> Result<LifxBulb> {
    let mac = parse_mac(address)
        .ok_or_else(|| RedeemError::MissingBulb(format!("invalid address {}", address)))?;
    found
        .iter()
        .find(|b| b.mac == mac)
        .copied()
        .ok_or_else(|| RedeemError::MissingBulb(address.to_string()))
}

#[async_trait]
impl LightController for LifxLights {
    async fn set_color(&self, slot: BulbSlot, color: Hsbk, transition: Duration) -> Result<()> {
        let bulb = self.bulb(slot);
        let packet = encode_message(
            Some(bulb.mac),
            0,
            MSG_SET_COLOR,
            &set_color_payload(color, transition),
        );
        self.socket
            .send_to(&packet, bulb.addr)
            .await
            .map_err(|e| RedeemError::Lighting(format!("send to {} failed: {}", bulb.mac_address(), e)))?;
        Ok(())
    }
}
