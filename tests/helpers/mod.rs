/// Test doubles simulating the serial line, the allocator and the application
/// during integration tests.
use dorime_sp::{
    core::{AckCode, Address, ACK_FRAME_LEN, START_FRAME_LEN},
    protocol::{
        events::HandleInfo,
        frame::{AckFrame, DataFrame, FrameCodec, StartFrame},
    },
    BufferAllocator, Config, Direction, Dorime, Event, EventHandler, FailureReason, SerialPort,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::mpsc;

//==================================================================================SERIAL_PORT
#[derive(Default)]
#[allow(dead_code)]
/// In-memory serial port recording every request made by the engine.
/// Transmitted frames are also pushed on `wire` when one is attached.
pub struct MockPort {
    pub tick: u32,
    pub sent: Vec<Vec<u8>>,
    pub receives: Vec<usize>,
    pub directions: Vec<Direction>,
    pub aborts: usize,
    pub fail_receive: bool,
    pub wire: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

#[allow(dead_code)]
impl MockPort {
    /// Port attached to a wire; the receiving end is returned alongside.
    pub fn wired() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let port = Self {
            wire: Some(tx),
            ..Self::default()
        };
        (port, rx)
    }
}

impl SerialPort for MockPort {
    type Error = ();

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.sent.push(bytes.to_vec());
        if let Some(wire) = &self.wire {
            wire.send(bytes.to_vec()).map_err(|_| ())?;
        }
        Ok(())
    }

    fn receive(&mut self, len: usize) -> Result<(), Self::Error> {
        if self.fail_receive {
            return Err(());
        }
        self.receives.push(len);
        Ok(())
    }

    fn select_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        self.directions.push(direction);
        Ok(())
    }

    fn abort_all(&mut self) {
        self.aborts += 1;
    }

    fn now(&self) -> u32 {
        self.tick
    }

    fn advance(&mut self, elapsed: u32) {
        self.tick = self.tick.wrapping_add(elapsed);
    }
}

//==================================================================================ALLOCATOR
#[derive(Default, Debug)]
/// Counters shared between a test and its allocator.
pub struct AllocStats {
    pub allocations: AtomicUsize,
    pub frees: AtomicUsize,
}

#[allow(dead_code)]
impl AllocStats {
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
/// Heap allocator counting calls and refusing sizes above `limit`.
pub struct CountingAllocator {
    pub stats: Arc<AllocStats>,
    pub limit: usize,
}

#[allow(dead_code)]
impl CountingAllocator {
    pub fn new(limit: usize) -> (Self, Arc<AllocStats>) {
        let stats = Arc::new(AllocStats::default());
        let allocator = Self {
            stats: stats.clone(),
            limit,
        };
        (allocator, stats)
    }
}

impl BufferAllocator for CountingAllocator {
    type Buffer = Vec<u8>;

    fn allocate(&mut self, size: usize) -> Option<Self::Buffer> {
        if size > self.limit {
            return None;
        }
        self.stats.allocations.fetch_add(1, Ordering::SeqCst);
        Some(vec![0; size])
    }

    fn free(&mut self, _buffer: Self::Buffer) {
        self.stats.frees.fetch_add(1, Ordering::SeqCst);
    }
}

//==================================================================================EVENTS
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(dead_code)]
/// Owned copy of an [`Event`].
pub enum Seen {
    AddressMatch {
        address: Address,
        transfer_id: u32,
        len: u16,
    },
    Data {
        transfer_id: u32,
        destination: Address,
        payload: Vec<u8>,
    },
    Response {
        transfer_id: u32,
        code: AckCode,
    },
    Failed {
        transfer_id: u32,
        reason: FailureReason,
    },
    AckOk {
        transfer_id: u32,
        destination: Address,
    },
}

#[derive(Default)]
/// Application double keeping every event it was handed.
pub struct Recorder {
    pub seen: Vec<Seen>,
    pub infos: Vec<HandleInfo>,
}

impl EventHandler for Recorder {
    fn on_event(&mut self, info: &HandleInfo, event: Event<'_>) {
        self.infos.push(*info);
        self.seen.push(match event {
            Event::AddressMatch {
                address,
                transfer_id,
                len,
            } => Seen::AddressMatch {
                address,
                transfer_id,
                len,
            },
            Event::DataReceived {
                transfer_id,
                destination,
                payload,
            } => Seen::Data {
                transfer_id,
                destination,
                payload: payload.to_vec(),
            },
            Event::ResponseReceived { transfer_id, code } => Seen::Response { transfer_id, code },
            Event::ReceiveFailed {
                transfer_id,
                reason,
            } => Seen::Failed {
                transfer_id,
                reason,
            },
            Event::AckOk {
                transfer_id,
                destination,
            } => Seen::AckOk {
                transfer_id,
                destination,
            },
        });
    }
}

//==================================================================================NODES
#[allow(dead_code)]
pub type Node = Dorime<MockPort, Recorder, CountingAllocator>;

#[allow(dead_code)]
/// Initialized handle with a counting allocator.
pub fn node(config: Config, port: MockPort, limit: usize) -> (Node, Arc<AllocStats>) {
    let (allocator, stats) = CountingAllocator::new(limit);
    let mut dorime = Dorime::with_parts(
        config,
        port,
        Recorder::default(),
        allocator,
        dorime_sp::infra::codec::checksum::Crc32,
    );
    dorime.init().expect("valid configuration");
    (dorime, stats)
}

#[allow(dead_code)]
/// Call `handler` until the state stops changing, like a busy main loop.
pub fn settle(node: &mut Node) {
    for _ in 0..32 {
        let before = node.state();
        node.handler().expect("handler failed");
        if node.state() == before {
            return;
        }
    }
}

//==================================================================================FRAMES
#[allow(dead_code)]
/// Codec matching the default configuration.
pub fn codec() -> FrameCodec {
    FrameCodec::default()
}

#[allow(dead_code)]
pub fn start_bytes(id: u32, destination: Address, len: u16) -> Vec<u8> {
    let mut out = vec![0u8; START_FRAME_LEN];
    codec()
        .encode_start(&StartFrame::new(id, destination, len), &mut out)
        .expect("start frame fits");
    out
}

#[allow(dead_code)]
pub fn ack_bytes(destination: Address, code: AckCode) -> Vec<u8> {
    let mut out = vec![0u8; ACK_FRAME_LEN];
    codec()
        .encode_ack(&AckFrame::new(destination, code), &mut out)
        .expect("ack frame fits");
    out
}

#[allow(dead_code)]
pub fn data_bytes(id: u32, destination: Address, payload: &[u8]) -> Vec<u8> {
    let frame = DataFrame::new(id, destination, payload);
    let mut out = vec![0u8; frame.encoded_len()];
    codec()
        .encode_data(&frame, &mut out)
        .expect("data frame fits");
    out
}
