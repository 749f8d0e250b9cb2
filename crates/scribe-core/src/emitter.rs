use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use crate::packet::{Packet, PacketPayload};

/// Ordered packet sink scoped to a single turn.
///
/// All packets pass through here, so the history is the authoritative
/// record of what the turn produced. There is one logical writer per
/// turn; the mutex exists so observers (tests, transports) can read the
/// history while the turn is still running.
pub struct Emitter {
    history: Mutex<Vec<Packet>>,
    live: Option<mpsc::UnboundedSender<Packet>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            live: None,
        }
    }

    /// Emitter that additionally forwards every packet to a live channel.
    /// A closed channel is logged and otherwise ignored; the history is
    /// still appended so persistence does not depend on the transport.
    pub fn with_channel(sender: mpsc::UnboundedSender<Packet>) -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            live: Some(sender),
        }
    }

    pub fn emit(&self, step_index: u64, payload: PacketPayload) {
        let packet = Packet {
            step_index,
            payload,
        };
        if let Some(sender) = &self.live {
            if sender.send(packet.clone()).is_err() {
                warn!(
                    packet_type = packet.payload.packet_type(),
                    "no live receiver - packet kept in history only"
                );
            }
        }
        self.history.lock().push(packet);
    }

    pub fn history(&self) -> Vec<Packet> {
        self.history.lock().clone()
    }

    pub fn last_payload(&self) -> Option<PacketPayload> {
        self.history.lock().last().map(|p| p.payload.clone())
    }

    /// Concatenation of all message content in emission order. This is
    /// the text the turn persists as the final answer.
    pub fn final_answer_text(&self) -> String {
        let history = self.history.lock();
        let mut out = String::new();
        for packet in history.iter() {
            if let Some(text) = packet.payload.message_text() {
                out.push_str(text);
            }
        }
        out
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
