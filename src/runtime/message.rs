use rtrb::{Consumer, Producer, RingBuffer};
use tracing::warn;

use crate::{control::router::ParameterUpdate, engine::EngineError, io::SharedBuffer};

/// Everything the control side can ask of a running thing.
///
/// Buffers arrive decoded: files are loaded off the audio thread and only
/// the shared handle crosses the queue.
#[derive(Debug)]
pub enum ThingMessage {
    /// A batch of `namespace:name` updates, plus thing-level keys such as
    /// `applyFx`.
    Update(ParameterUpdate),
    /// New buffer for the granular player.
    Soundfile {
        buffer: SharedBuffer,
        play_on_load: bool,
    },
    /// Play `buffer` once through the gain kept for `url`.
    TriggerFile {
        url: String,
        buffer: SharedBuffer,
        volume_db: f32,
    },
    /// Retarget the gain kept for `url`.
    TriggerVolume { url: String, volume_db: f32 },
}

/// Producing end of the control queue.
pub struct ThingHandle {
    tx: Producer<ThingMessage>,
}

impl ThingHandle {
    /// Queue a message for the next block. Never blocks.
    pub fn send(&mut self, message: ThingMessage) -> Result<(), EngineError> {
        self.tx.push(message).map_err(|_| {
            warn!("control queue full, message dropped");
            EngineError::QueueFull
        })
    }

    /// Free slots left in the queue.
    pub fn slots(&self) -> usize {
        self.tx.slots()
    }

    /// Whether the consuming thing has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_abandoned()
    }
}

pub fn control_queue(capacity: usize) -> (ThingHandle, Consumer<ThingMessage>) {
    let (tx, rx) = RingBuffer::new(capacity);
    (ThingHandle { tx }, rx)
}
