//! Sender side of a transfer: Start/ack handshake, Data/ack handshake and
//! the ways a peer can refuse or ignore it.
mod helpers;

use dorime_sp::{
    core::{AckCode, Address},
    Config, DorimeError, FailureReason, State,
};
use helpers::{ack_bytes, data_bytes, node, settle, start_bytes, MockPort, Node, Seen};

const TARGET: Address = Address(0x0042);

/// Target handle that announced `payload` to the controller and got its
/// Start frame acknowledged; ends in `WaitDataSent`.
fn handshake(payload: &[u8]) -> (Node, std::sync::Arc<helpers::AllocStats>) {
    let (mut target, stats) = node(Config::new(TARGET), MockPort::default(), 1024);
    settle(&mut target);

    assert_eq!(target.send_data(Address::CONTROLLER, payload), Ok(0));
    settle(&mut target);
    assert_eq!(target.state(), State::WaitStartSent);
    target.tx_event().unwrap();
    assert_eq!(target.state(), State::StartWaitingAck);

    target
        .rx_event(&ack_bytes(Address::BROADCAST, AckCode::ACK))
        .unwrap();
    settle(&mut target);
    assert_eq!(target.state(), State::WaitDataSent);
    (target, stats)
}

#[test]
/// Target to controller transfer; the controller answers on broadcast.
fn test_target_reports_to_controller() {
    let (mut target, stats) = handshake(b"status");

    assert_eq!(target.port().aborts, 1, "listening must stop before sending");
    assert_eq!(
        target.port().sent,
        vec![
            start_bytes(0, Address::CONTROLLER, 6),
            data_bytes(0, Address::CONTROLLER, b"status"),
        ]
    );

    target.tx_event().unwrap();
    assert_eq!(target.state(), State::SendWaitingAck);
    target
        .rx_event(&ack_bytes(Address::BROADCAST, AckCode::ACK))
        .unwrap();
    settle(&mut target);

    assert_eq!(target.state(), State::Idle);
    assert_eq!(
        target.events().seen,
        vec![Seen::AckOk {
            transfer_id: 0,
            destination: Address::CONTROLLER
        }]
    );
    assert_eq!(stats.allocations(), 1);
    assert_eq!(stats.frees(), 1);
}

#[test]
/// A NACK on the Data frame is handed to the application as is.
fn test_data_nack_reports_response() {
    let (mut target, stats) = handshake(b"status");
    target.tx_event().unwrap();
    target
        .rx_event(&ack_bytes(Address::BROADCAST, AckCode::NACK))
        .unwrap();
    settle(&mut target);

    assert_eq!(target.state(), State::Idle);
    assert_eq!(
        target.events().seen,
        vec![Seen::Response {
            transfer_id: 0,
            code: AckCode::NACK
        }]
    );
    assert_eq!(stats.frees(), 1);
}

#[test]
/// The Data ack must come within the send timeout.
fn test_data_ack_times_out() {
    let (mut target, stats) = handshake(b"status");
    target.tx_event().unwrap();

    target.tick(99).unwrap();
    settle(&mut target);
    assert_eq!(target.state(), State::SendWaitingAck);

    target.tick(1).unwrap();
    settle(&mut target);
    assert_eq!(target.state(), State::Cooldown);
    assert_eq!(
        target.events().seen,
        vec![Seen::Failed {
            transfer_id: 0,
            reason: FailureReason::Timeout
        }]
    );
    assert_eq!(stats.frees(), 1);
}

#[test]
/// A corrupted ack fails the transfer instead of completing it.
fn test_corrupted_ack_fails_transfer() {
    let (mut target, _) = handshake(b"status");
    target.tx_event().unwrap();

    let mut ack = ack_bytes(Address::BROADCAST, AckCode::ACK);
    ack[5] ^= 0x80;
    target.rx_event(&ack).unwrap();
    settle(&mut target);

    assert_eq!(target.state(), State::Cooldown);
    assert_eq!(
        target.events().seen,
        vec![Seen::Failed {
            transfer_id: 0,
            reason: FailureReason::Integrity
        }]
    );
}

#[test]
/// No new transfer while one is announced or running.
fn test_send_refused_while_busy() {
    let (mut target, _) = node(Config::new(TARGET), MockPort::default(), 1024);
    settle(&mut target);
    target.rx_event(&start_bytes(3, TARGET, 1)).unwrap();
    assert_eq!(target.state(), State::Idle);
    assert_eq!(
        target.send_data(Address::CONTROLLER, b"x"),
        Err(DorimeError::Busy)
    );

    settle(&mut target);
    assert_eq!(target.state(), State::WaitAckSent);
    assert_eq!(
        target.send_data(Address::CONTROLLER, b"x"),
        Err(DorimeError::Busy)
    );
}

#[test]
/// Transfer ids keep counting across completed transfers.
fn test_transfer_ids_are_sequential() {
    let (mut controller, _) = node(
        Config::new(Address::CONTROLLER),
        MockPort::default(),
        1024,
    );
    for expected in 0..3 {
        assert_eq!(controller.send_alive(TARGET), Ok(expected));
        controller.abort().unwrap();
        settle(&mut controller);
    }
}
