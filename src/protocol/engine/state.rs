//! States of the protocol engine.
//!
//! ```text
//! receiver: Idle -> AddressCheck -> SendAck -> WaitAckSent -> WaitingPacket
//!           WaitingPacket -> ReceivedPacket | PacketFailed -> SendReply -> WaitReplySent -> Abort
//! sender:   Idle -> StartSend -> WaitStartSent -> StartWaitingAck -> StartAckReceived
//!           StartAckReceived -> SendData -> WaitDataSent -> SendWaitingAck -> SendAckReceived -> Abort
//! broadcast: WaitStartSent -> BroadcastGap -> SendData -> WaitDataSent -> SendAckReceived -> Abort
//! cleanup:  any timeout -> Cooldown -> Abort -> Idle
//! ```

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Rest point; listens for Start frames.
    Idle,

    //==================================================================================Receiver
    /// A Start frame arrived; decide whether it concerns this device.
    AddressCheck,
    /// Transmit the ack of the accepted Start frame.
    SendAck,
    /// Wait until the ack left the wire.
    WaitAckSent,
    /// Wait for the Data frame.
    WaitingPacket,
    /// Decode the Data frame and deliver it.
    ReceivedPacket,
    /// Report the failed Data frame.
    PacketFailed,
    /// Answer the Data frame (ack or nack).
    SendReply,
    /// Wait until the answer left the wire.
    WaitReplySent,

    //==================================================================================Sender
    /// Transmit the Start frame of a local transfer.
    StartSend,
    /// Wait until the Start frame left the wire.
    WaitStartSent,
    /// Wait for the peer's answer to the Start frame.
    StartWaitingAck,
    /// Check the peer's answer to the Start frame.
    StartAckReceived,
    /// Broadcast only: keep the line quiet after the Start frame so every
    /// target has time to start listening for the Data frame.
    BroadcastGap,
    /// Transmit the Data frame.
    SendData,
    /// Wait until the Data frame left the wire.
    WaitDataSent,
    /// Wait for the peer's answer to the Data frame.
    SendWaitingAck,
    /// Check the peer's answer and conclude the transfer.
    SendAckReceived,

    //==================================================================================Cleanup
    /// Settle period after a timeout or failure; keeps the transport and
    /// the buffer released until the cooldown deadline.
    Cooldown,
    /// Release everything and go back to `Idle`.
    Abort,
}

impl State {
    pub fn is_idle(self) -> bool {
        self == State::Idle
    }
}
