//! Tick-polled protocol engine.
//!
//! [`Dorime`] owns everything a transfer needs (port, allocator, codec,
//! session) and advances one state per [`handler`](Dorime::handler) call.
//! Transport completions reported through [`tx_event`](Dorime::tx_event)
//! and [`rx_event`](Dorime::rx_event) only move the engine out of the
//! matching wait state; deadlines are checked by `handler` against the
//! port's tick counter. Nothing here ever blocks.
//!
//! Every timeout and failure converges on `Cooldown`, then `Abort`, which
//! aborts the transport and releases the session buffer before returning to
//! `Idle`, so no path can leak the buffer or leave a transfer dangling.
use crate::core::{
    is_alive_probe, AckCode, Address, FrameKind, Role, ACK_FRAME_LEN,
    ALIVE_CONTROLLER_TO_TARGET, ALIVE_TARGET_TO_CONTROLLER, DATA_FRAME_OVERHEAD,
    MAX_PAYLOAD_LEN, START_FRAME_LEN,
};
use crate::error::{ConfigError, DorimeError, FailureReason, TransportOp};
use crate::infra::codec::checksum::{Checksum, Crc32};
use crate::protocol::events::{Event, EventHandler, HandleInfo};
use crate::protocol::frame::{AckFrame, DataFrame, FrameCodec, StartFrame};
use crate::protocol::session::{Deadline, FrameStore, Session, SessionBuffer};
use crate::protocol::transport::traits::allocator::{BufferAllocator, HeapAllocator};
use crate::protocol::transport::traits::serial_port::{Direction, SerialPort};

mod config;
mod state;

pub use config::{Config, Timing};
pub use state::State;

/// Transport operation started by the engine and not yet completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum PendingIo {
    Transmit,
    Receive(FrameKind),
}

//==================================================================================DORIME
/// Control handle of one device on the line.
pub struct Dorime<P, H, A = HeapAllocator, C = Crc32>
where
    P: SerialPort,
    H: EventHandler,
    A: BufferAllocator,
    C: Checksum,
{
    config: Config,
    timing: Timing,
    role: Role,
    port: P,
    events: H,
    codec: FrameCodec<C>,
    buffer: SessionBuffer<A>,
    frames: FrameStore,
    state: State,
    session: Option<Session>,
    pending: Option<PendingIo>,
    direction: Direction,
    cooldown_deadline: Option<Deadline>,
    next_transfer_id: u32,
    now: u32,
    initialized: bool,
}

impl<P, H> Dorime<P, H>
where
    P: SerialPort,
    H: EventHandler,
{
    /// Handle using the global heap and the default CRC-32.
    pub fn new(config: Config, port: P, events: H) -> Self {
        Self::with_parts(config, port, events, HeapAllocator, Crc32)
    }
}

impl<P, H, A, C> Dorime<P, H, A, C>
where
    P: SerialPort,
    H: EventHandler,
    A: BufferAllocator,
    C: Checksum,
{
    /// Handle with a custom allocator and checksum. Call [`init`](Self::init)
    /// before anything else.
    pub fn with_parts(config: Config, port: P, events: H, allocator: A, checksum: C) -> Self {
        Self {
            config,
            timing: Timing::default(),
            role: config.role(),
            port,
            events,
            codec: FrameCodec::new(config.endianness, checksum),
            buffer: SessionBuffer::new(allocator),
            frames: FrameStore::new(config.buffer_strategy),
            state: State::Idle,
            session: None,
            pending: None,
            direction: Direction::Sleep,
            cooldown_deadline: None,
            next_transfer_id: 0,
            now: 0,
            initialized: false,
        }
    }

    //==================================================================================Public API
    /// Validate the configuration and reset the handle to `Idle`. Any
    /// transfer in flight is dropped.
    pub fn init(&mut self) -> Result<(), DorimeError> {
        self.timing = self.config.timing()?;
        self.role = self.config.role();

        self.port.lock();
        if self.pending.take().is_some() {
            self.port.abort_all();
        }
        self.buffer.release();
        self.frames.clear();
        self.session = None;
        self.cooldown_deadline = None;
        self.state = State::Idle;
        self.now = self.port.now();
        self.initialized = true;
        self.port.unlock();

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Dorime initialized at {=u16:#x} as {}",
            self.config.address.0,
            self.role
        );
        Ok(())
    }

    /// Report that `elapsed` ticks went by. Ports counting ticks in software
    /// advance their counter; the handle then samples it.
    pub fn tick(&mut self, elapsed: u32) -> Result<(), DorimeError> {
        self.guarded(|this| {
            this.port.advance(elapsed);
            this.now = this.port.now();
            Ok(())
        })
    }

    /// Run the action bound to the current state once and move to the next
    /// state. Adapter failures are returned after the engine moved to
    /// `Cooldown`; the call is never retried internally.
    pub fn handler(&mut self) -> Result<(), DorimeError> {
        self.guarded(|this| {
            this.now = this.port.now();
            let outcome = this.run_state();
            this.settle(outcome)
        })
    }

    /// The transmission started by the engine left the wire.
    pub fn tx_event(&mut self) -> Result<(), DorimeError> {
        self.guarded(|this| {
            if this.pending != Some(PendingIo::Transmit) {
                return Ok(());
            }
            this.pending = None;
            this.now = this.port.now();

            let outcome = match this.state {
                State::WaitAckSent => this.arm_data_receive().map(|_| State::WaitingPacket),
                // Nobody acks a broadcast Start: hold the line until every
                // target had a chance to arm its Data reception.
                State::WaitStartSent if this.session_is_broadcast() => {
                    this.arm_broadcast_gap();
                    Ok(State::BroadcastGap)
                }
                State::WaitStartSent => this.arm_ack_receive().map(|_| State::StartWaitingAck),
                // Broadcasts are complete once on the wire.
                State::WaitDataSent if this.session_is_broadcast() => Ok(State::SendAckReceived),
                State::WaitDataSent => this.arm_ack_receive().map(|_| State::SendWaitingAck),
                State::WaitReplySent => Ok(State::Abort),
                other => Ok(other),
            };
            this.settle(outcome)
        })
    }

    /// The reception started by the engine completed with `data`.
    ///
    /// Data frames move `WaitingPacket` to `ReceivedPacket`, unless the
    /// receive deadline already passed: a late frame is dropped and the next
    /// `handler` call reports the timeout. Start and Ack frames are stored and
    /// picked up by the next `handler` call; in every other situation the
    /// call is ignored.
    pub fn rx_event(&mut self, data: &[u8]) -> Result<(), DorimeError> {
        self.guarded(|this| {
            let Some(PendingIo::Receive(kind)) = this.pending else {
                return Ok(());
            };
            this.pending = None;

            #[cfg(feature = "defmt")]
            defmt::debug!("RX {} bytes for {}", data.len(), kind);

            match kind {
                FrameKind::Data if this.state == State::WaitingPacket => {
                    this.now = this.port.now();
                    let expired = this
                        .session
                        .and_then(|s| s.receive_deadline)
                        .is_some_and(|d| d.has_elapsed(this.now));
                    if expired {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("Data frame completed after its deadline");
                        return Ok(());
                    }
                    this.buffer.fill(data);
                    this.enter(State::ReceivedPacket);
                }
                FrameKind::Data => {}
                FrameKind::Start | FrameKind::Ack => this.frames.store(kind, data),
            }
            Ok(())
        })
    }

    /// Cancel whatever is going on. The transport is aborted at once; the
    /// next `handler` call releases the buffer and returns to `Idle`.
    pub fn abort(&mut self) -> Result<(), DorimeError> {
        self.guarded(|this| {
            this.port.abort_all();
            this.pending = None;
            this.enter(State::Abort);
            Ok(())
        })
    }

    /// Start a transfer of `payload` to `destination`; returns its transfer id.
    ///
    /// Only allowed from `Idle`. A target may only address the controller;
    /// the controller may address any target or broadcast.
    pub fn send_data(&mut self, destination: Address, payload: &[u8]) -> Result<u32, DorimeError> {
        self.guarded(|this| {
            if !this.state.is_idle() || this.frames.pending(FrameKind::Start).is_some() {
                return Err(DorimeError::Busy);
            }
            if destination == this.config.address {
                return Err(ConfigError::SelfAddressed.into());
            }
            if this.role == Role::Target && !destination.is_controller() {
                return Err(ConfigError::TargetToTarget.into());
            }
            if payload.len() > MAX_PAYLOAD_LEN {
                return Err(DorimeError::PayloadTooLarge { len: payload.len() });
            }

            let transfer_id = this.next_transfer_id;
            let frame = DataFrame::new(transfer_id, destination, payload);
            this.buffer.allocate(frame.encoded_len())?;
            let encoded = match this.buffer.storage_mut() {
                Some(storage) => this.codec.encode_data(&frame, storage),
                None => return Err(DorimeError::Busy),
            };
            match encoded {
                Ok(len) => this.buffer.set_filled(len),
                Err(err) => {
                    this.buffer.release();
                    return Err(err.into());
                }
            }

            this.next_transfer_id = transfer_id.wrapping_add(1);
            this.session = Some(Session::outgoing(
                transfer_id,
                destination,
                payload.len() as u16,
            ));
            this.enter(State::StartSend);

            #[cfg(feature = "defmt")]
            defmt::info!(
                "Transfer {} of {} bytes to {=u16:#x}",
                transfer_id,
                payload.len(),
                destination.0
            );
            Ok(transfer_id)
        })
    }

    /// Send the keep-alive probe matching this device's role.
    pub fn send_alive(&mut self, destination: Address) -> Result<u32, DorimeError> {
        let probe = match self.role {
            Role::Controller => ALIVE_CONTROLLER_TO_TARGET,
            Role::Target => ALIVE_TARGET_TO_CONTROLLER,
        };
        debug_assert!(is_alive_probe(probe));
        self.send_data(destination, probe)
    }

    //==================================================================================Accessors
    pub fn state(&self) -> State {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last direction requested from the port.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Last tick sampled from the port.
    pub fn now(&self) -> u32 {
        self.now
    }

    /// Whether a session buffer is currently allocated.
    pub fn buffer_held(&self) -> bool {
        self.buffer.is_held()
    }

    pub fn frame_store(&self) -> &FrameStore {
        &self.frames
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn events(&self) -> &H {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut H {
        &mut self.events
    }

    pub fn allocator(&self) -> &A {
        self.buffer.allocator()
    }

    pub fn info(&self) -> HandleInfo {
        HandleInfo {
            address: self.config.address,
            role: self.role,
        }
    }

    //==================================================================================State actions
    fn run_state(&mut self) -> Result<State, DorimeError> {
        match self.state {
            State::Idle => self.on_idle(),
            State::AddressCheck => self.on_address_check(),
            State::SendAck => self.on_send_ack(),
            State::WaitAckSent => self.on_wait_sent(State::WaitAckSent, true),
            State::WaitingPacket => self.on_waiting_packet(),
            State::ReceivedPacket => self.on_received_packet(),
            State::PacketFailed => self.on_packet_failed(),
            State::SendReply => self.on_send_reply(),
            State::WaitReplySent => self.on_wait_sent(State::WaitReplySent, false),
            State::StartSend => self.on_start_send(),
            State::WaitStartSent => self.on_wait_sent(State::WaitStartSent, true),
            State::StartWaitingAck => self.on_waiting_ack(State::StartWaitingAck),
            State::StartAckReceived => self.on_start_ack_received(),
            State::BroadcastGap => self.on_broadcast_gap(),
            State::SendData => self.on_send_data(),
            State::WaitDataSent => self.on_wait_sent(State::WaitDataSent, true),
            State::SendWaitingAck => self.on_waiting_ack(State::SendWaitingAck),
            State::SendAckReceived => self.on_send_ack_received(),
            State::Cooldown => self.on_cooldown(),
            State::Abort => self.on_abort(),
        }
    }

    fn on_idle(&mut self) -> Result<State, DorimeError> {
        if self.frames.pending(FrameKind::Start).is_some() {
            return Ok(State::AddressCheck);
        }
        if self.pending.is_none() {
            self.set_direction(Direction::Rx)?;
            self.port
                .receive(START_FRAME_LEN)
                .map_err(|_| Self::transport_failure(TransportOp::Receive))?;
            self.pending = Some(PendingIo::Receive(FrameKind::Start));
        }
        Ok(State::Idle)
    }

    fn on_address_check(&mut self) -> Result<State, DorimeError> {
        let Some(bytes) = self.frames.pending(FrameKind::Start) else {
            return Ok(State::Idle);
        };
        let decoded = self.codec.decode_start(bytes);
        self.frames.consume(FrameKind::Start);

        let start = match decoded {
            Ok(start) => start,
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Start frame rejected: {}", _err);
                return Ok(State::Cooldown);
            }
        };

        if !self.config.address.accepts(start.destination) {
            #[cfg(feature = "defmt")]
            defmt::trace!("Start frame for {=u16:#x} ignored", start.destination.0);
            return Ok(State::Cooldown);
        }
        if self.role == Role::Controller && start.destination.is_broadcast() {
            // Only the controller broadcasts: a second one means a wiring or
            // addressing mistake, not something to arbitrate.
            #[cfg(feature = "defmt")]
            defmt::warn!("Controller received a broadcast Start frame");
            return Ok(State::Cooldown);
        }

        self.session = Some(Session::incoming(&start));
        let size = DATA_FRAME_OVERHEAD + start.payload_len as usize;
        if self.buffer.allocate(size).is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("No buffer for a {} bytes transfer", size);
            self.dispatch_failure(FailureReason::Allocation);
            return Ok(State::Cooldown);
        }

        self.dispatch(Event::AddressMatch {
            address: start.destination,
            transfer_id: start.id,
            len: start.payload_len,
        });

        if start.destination.is_broadcast() {
            self.arm_data_receive()?;
            Ok(State::WaitingPacket)
        } else {
            Ok(State::SendAck)
        }
    }

    fn on_send_ack(&mut self) -> Result<State, DorimeError> {
        self.transmit_ack(AckCode::ACK)?;
        Ok(State::WaitAckSent)
    }

    /// Pure wait for `tx_event`; only the send deadline is checked here.
    fn on_wait_sent(&mut self, current: State, report: bool) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        if session.send_deadline.is_some_and(|d| d.has_elapsed(self.now)) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Transmission timed out in {}", current);
            if report {
                self.dispatch_failure(FailureReason::Timeout);
            }
            return Ok(State::Cooldown);
        }
        Ok(current)
    }

    fn on_waiting_packet(&mut self) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        if session.receive_deadline.is_some_and(|d| d.has_elapsed(self.now)) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Data frame of transfer {} never came", session.transfer_id);
            self.dispatch_failure(FailureReason::Timeout);
            return Ok(State::Cooldown);
        }
        Ok(State::WaitingPacket)
    }

    fn on_received_packet(&mut self) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        let info = self.info();

        let outcome = match self.codec.decode_data(self.buffer.bytes()) {
            Ok(frame)
                if frame.id == session.transfer_id
                    && frame.destination == session.destination
                    && frame.payload.len() == session.expected_len as usize =>
            {
                self.events.on_event(
                    &info,
                    Event::DataReceived {
                        transfer_id: frame.id,
                        destination: frame.destination,
                        payload: frame.payload,
                    },
                );
                Ok(())
            }
            Ok(_) => Err(FailureReason::UnexpectedFrame),
            Err(err) => Err(FailureReason::from(err)),
        };

        match outcome {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("Transfer {} delivered", session.transfer_id);
                if session.is_broadcast() {
                    return Ok(State::Abort);
                }
                self.update_session(|s| s.reply = AckCode::ACK);
                Ok(State::SendReply)
            }
            Err(reason) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Transfer {} failed: {}", session.transfer_id, reason);
                self.update_session(|s| s.failure = Some(reason));
                Ok(State::PacketFailed)
            }
        }
    }

    fn on_packet_failed(&mut self) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        self.dispatch_failure(session.failure.unwrap_or(FailureReason::Malformed));
        if session.is_broadcast() {
            return Ok(State::Abort);
        }
        self.update_session(|s| s.reply = AckCode::NACK);
        Ok(State::SendReply)
    }

    fn on_send_reply(&mut self) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        self.transmit_ack(session.reply)?;
        Ok(State::WaitReplySent)
    }

    fn on_start_send(&mut self) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        // Stop listening for Start frames before driving the line.
        self.cancel_pending();

        let frame = StartFrame::new(session.transfer_id, session.destination, session.expected_len);
        let mut out = [0u8; START_FRAME_LEN];
        let len = self.codec.encode_start(&frame, &mut out)?;
        self.transmit(&out[..len])?;
        Ok(State::WaitStartSent)
    }

    fn on_waiting_ack(&mut self, current: State) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        if self.frames.pending(FrameKind::Ack).is_some() {
            return Ok(match current {
                State::StartWaitingAck => State::StartAckReceived,
                _ => State::SendAckReceived,
            });
        }
        if session.send_deadline.is_some_and(|d| d.has_elapsed(self.now)) {
            #[cfg(feature = "defmt")]
            defmt::warn!("No answer to transfer {}", session.transfer_id);
            self.dispatch_failure(FailureReason::Timeout);
            return Ok(State::Cooldown);
        }
        Ok(current)
    }

    fn on_start_ack_received(&mut self) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        match self.take_ack() {
            Ok(code) if code.is_ack() => Ok(State::SendData),
            Ok(code) => {
                self.dispatch(Event::ResponseReceived {
                    transfer_id: session.transfer_id,
                    code,
                });
                Ok(State::Abort)
            }
            Err(reason) => {
                self.dispatch_failure(reason);
                Ok(State::Cooldown)
            }
        }
    }

    fn on_broadcast_gap(&mut self) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        match session.send_deadline {
            Some(deadline) if !deadline.has_elapsed(self.now) => Ok(State::BroadcastGap),
            _ => Ok(State::SendData),
        }
    }

    fn on_send_data(&mut self) -> Result<State, DorimeError> {
        if self.session.is_none() || !self.buffer.is_held() {
            return Ok(State::Abort);
        }
        self.set_direction(Direction::Tx)?;
        self.port
            .transmit(self.buffer.bytes())
            .map_err(|_| Self::transport_failure(TransportOp::Transmit))?;
        self.pending = Some(PendingIo::Transmit);
        self.arm_send_deadline();
        Ok(State::WaitDataSent)
    }

    fn on_send_ack_received(&mut self) -> Result<State, DorimeError> {
        let Some(session) = self.session else {
            return Ok(State::Abort);
        };
        let completed = Event::AckOk {
            transfer_id: session.transfer_id,
            destination: session.destination,
        };
        if session.is_broadcast() {
            self.dispatch(completed);
            return Ok(State::Abort);
        }
        match self.take_ack() {
            Ok(code) if code.is_ack() => {
                #[cfg(feature = "defmt")]
                defmt::info!("Transfer {} acknowledged", session.transfer_id);
                self.dispatch(completed);
                Ok(State::Abort)
            }
            Ok(code) => {
                self.dispatch(Event::ResponseReceived {
                    transfer_id: session.transfer_id,
                    code,
                });
                Ok(State::Abort)
            }
            Err(reason) => {
                self.dispatch_failure(reason);
                Ok(State::Cooldown)
            }
        }
    }

    fn on_cooldown(&mut self) -> Result<State, DorimeError> {
        self.cancel_pending();
        self.buffer.release();

        let deadline = *self
            .cooldown_deadline
            .get_or_insert(Deadline::after(self.now, self.timing.cooldown));
        if deadline.has_elapsed(self.now) {
            return Ok(State::Abort);
        }
        Ok(State::Cooldown)
    }

    fn on_abort(&mut self) -> Result<State, DorimeError> {
        self.port.abort_all();
        self.pending = None;
        self.buffer.release();
        self.frames.clear();
        self.session = None;
        self.cooldown_deadline = None;
        if self.set_direction(Direction::Sleep).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Could not release the line");
        }
        Ok(State::Idle)
    }

    //==================================================================================Transitions
    /// Apply the outcome of an action or event: move to the next state, or
    /// to `Cooldown` when an adapter call failed.
    fn settle(&mut self, outcome: Result<State, DorimeError>) -> Result<(), DorimeError> {
        match outcome {
            Ok(next) => {
                self.enter(next);
                Ok(())
            }
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::error!("{} failed in {}", err, self.state);
                self.enter(State::Cooldown);
                Err(err)
            }
        }
    }

    fn enter(&mut self, next: State) {
        if next == self.state {
            return;
        }
        #[cfg(feature = "defmt")]
        defmt::trace!("{} -> {}", self.state, next);

        if next == State::Cooldown {
            self.cooldown_deadline = Some(Deadline::after(self.now, self.timing.cooldown));
        }
        self.state = next;
    }

    //==================================================================================Helpers
    /// Run `op` inside the port's critical section, once initialized.
    fn guarded<R>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<R, DorimeError>,
    ) -> Result<R, DorimeError> {
        if !self.initialized {
            return Err(DorimeError::NotInitialized);
        }
        self.port.lock();
        let result = op(self);
        self.port.unlock();
        result
    }

    fn transport_failure(op: TransportOp) -> DorimeError {
        DorimeError::TransportFailure(op)
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), DorimeError> {
        self.port
            .select_direction(direction)
            .map_err(|_| Self::transport_failure(TransportOp::SelectDirection))?;
        self.direction = direction;
        Ok(())
    }

    /// Abort the outstanding transport operation, if any.
    fn cancel_pending(&mut self) {
        if self.pending.take().is_some() {
            self.port.abort_all();
        }
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), DorimeError> {
        self.set_direction(Direction::Tx)?;
        self.port
            .transmit(bytes)
            .map_err(|_| Self::transport_failure(TransportOp::Transmit))?;
        self.pending = Some(PendingIo::Transmit);
        self.arm_send_deadline();

        #[cfg(feature = "defmt")]
        defmt::debug!("TX {=[u8]:x}", bytes);
        Ok(())
    }

    /// Acks from a target always go to the controller; the controller
    /// cannot tell which target spoke, so it answers on broadcast.
    fn transmit_ack(&mut self, code: AckCode) -> Result<(), DorimeError> {
        let destination = match self.role {
            Role::Target => Address::CONTROLLER,
            Role::Controller => Address::BROADCAST,
        };
        let mut out = [0u8; ACK_FRAME_LEN];
        let len = self
            .codec
            .encode_ack(&AckFrame::new(destination, code), &mut out)?;
        self.transmit(&out[..len])
    }

    fn arm_send_deadline(&mut self) {
        let deadline = Deadline::after(self.now, self.timing.send);
        self.update_session(|s| s.send_deadline = Some(deadline));
    }

    /// The send deadline doubles as the end of the broadcast gap; it is
    /// re-armed when the Data frame goes out.
    fn arm_broadcast_gap(&mut self) {
        let deadline = Deadline::after(self.now, self.timing.broadcast_gap);
        self.update_session(|s| s.send_deadline = Some(deadline));
    }

    fn arm_data_receive(&mut self) -> Result<(), DorimeError> {
        let len = self.buffer.capacity();
        self.set_direction(Direction::Rx)?;
        self.port
            .receive(len)
            .map_err(|_| Self::transport_failure(TransportOp::Receive))?;
        self.pending = Some(PendingIo::Receive(FrameKind::Data));

        let deadline = Deadline::after(self.now, self.timing.receive);
        self.update_session(|s| s.receive_deadline = Some(deadline));
        Ok(())
    }

    /// Listen for the peer's answer; the send deadline keeps running.
    fn arm_ack_receive(&mut self) -> Result<(), DorimeError> {
        self.set_direction(Direction::Rx)?;
        self.port
            .receive(ACK_FRAME_LEN)
            .map_err(|_| Self::transport_failure(TransportOp::Receive))?;
        self.pending = Some(PendingIo::Receive(FrameKind::Ack));
        Ok(())
    }

    /// Decode and consume the stored Ack frame.
    fn take_ack(&mut self) -> Result<AckCode, FailureReason> {
        let decoded = match self.frames.pending(FrameKind::Ack) {
            Some(bytes) => self.codec.decode_ack(bytes),
            None => return Err(FailureReason::Malformed),
        };
        self.frames.consume(FrameKind::Ack);

        let ack = decoded?;
        if !self.config.address.accepts(ack.destination) {
            return Err(FailureReason::UnexpectedFrame);
        }
        Ok(ack.code)
    }

    fn session_is_broadcast(&self) -> bool {
        self.session.is_some_and(|s| s.is_broadcast())
    }

    fn update_session(&mut self, update: impl FnOnce(&mut Session)) {
        if let Some(session) = self.session.as_mut() {
            update(session);
        }
    }

    fn dispatch(&mut self, event: Event<'_>) {
        let info = self.info();
        self.events.on_event(&info, event);
    }

    fn dispatch_failure(&mut self, reason: FailureReason) {
        let transfer_id = self.session.map_or(0, |s| s.transfer_id);
        self.dispatch(Event::ReceiveFailed {
            transfer_id,
            reason,
        });
    }
}
