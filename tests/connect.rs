mod common;

use std::sync::Arc;
use std::time::Duration;

use blesense::transport::{self, LinkEvent, TransportEvent};
use blesense::*;
use common::*;
use futures_lite::StreamExt;

async fn wait_for_connecting(session: &Session<Arc<MockTransport>>) {
    while session.pending_connect().is_none() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test]
async fn watchdog_abandons_silent_peripheral() {
    let session = new_session();
    let mut events = session.events();

    let res = session
        .connect_with_timeout(peripheral(), Some(Duration::from_millis(50)))
        .await;

    assert_eq!(res, Err(SessionError::InvalidDevice));
    assert!(session.state().is_idle());
    assert_eq!(session.pending_connect(), None);
    assert_eq!(
        session.transport().calls(),
        vec![Call::Connect(peripheral()), Call::Disconnect(peripheral())]
    );

    let mut invalid = false;
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(10), events.next()).await {
        invalid |= event == SessionEvent::InvalidDevice(peripheral());
    }
    assert!(invalid);
}

#[tokio::test]
async fn watchdog_rejects_busy_session() {
    let session = active_session(vec![weather_service()]);
    let res = session.connect_with_timeout(peripheral(), None).await;
    assert_eq!(res, Err(SessionError::AlreadyConnected));
}

#[tokio::test]
async fn run_drives_session_to_active() {
    let session = Arc::new(new_session());
    let (sender, receiver) = transport::channel();

    let pump = session.clone();
    let runner = tokio::spawn(async move { pump.run(receiver).await });

    let platform = async {
        wait_for_connecting(&session).await;
        sender
            .send(TransportEvent::Link(LinkEvent::Established))
            .await
            .unwrap();
        sender
            .send(TransportEvent::ServicesDiscovered(vec![generic_access(), light_service()]))
            .await
            .unwrap();
    };

    let (res, ()) = tokio::join!(
        session.connect_with_timeout(peripheral(), Some(Duration::from_secs(5))),
        platform
    );
    res.unwrap();
    assert_eq!(session.state().active().unwrap().label, "IPVSLight");

    session.write(intensity(), "255").unwrap();
    sender
        .send(read_completed(intensity(), &[0xff, 0x00]))
        .await
        .unwrap();
    sender.close();
    runner.await.unwrap();

    assert_eq!(session.state().active().unwrap().value(&intensity()), Some("255"));
}

#[tokio::test]
async fn watchdog_reports_discovery_mismatch() {
    let session = Arc::new(new_session());
    let (sender, receiver) = transport::channel();

    let pump = session.clone();
    let runner = tokio::spawn(async move { pump.run(receiver).await });

    let platform = async {
        wait_for_connecting(&session).await;
        sender
            .send(TransportEvent::Link(LinkEvent::Established))
            .await
            .unwrap();
        sender
            .send(TransportEvent::ServicesDiscovered(vec![generic_access()]))
            .await
            .unwrap();
    };

    let (res, ()) = tokio::join!(
        session.connect_with_timeout(peripheral(), Some(Duration::from_secs(5))),
        platform
    );
    assert_eq!(res, Err(SessionError::InvalidDevice));
    assert!(session.state().is_idle());

    sender.close();
    runner.await.unwrap();
}
