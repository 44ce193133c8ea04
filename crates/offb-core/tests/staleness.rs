mod common;

use common::{status, steady_loop, RecordingLink, TICK};
use offb_core::arbiter::Phase;
use offb_core::control::ControlLoop;
use offb_core::ingest::Twist;
use offb_core::TickReport;
use tokio::time::advance;

async fn step(lp: &mut ControlLoop<RecordingLink>, ticks: usize) -> TickReport {
    let mut last = None;
    for _ in 0..ticks {
        advance(TICK).await;
        last = Some(lp.tick().await);
    }
    last.expect("at least one tick")
}

fn thrust(r: &TickReport) -> f32 {
    r.published.expect("setpoint published").1.thrust
}

#[tokio::test(start_paused = true)]
async fn command_integrates_then_goes_stale() {
    let (mut lp, tx) = steady_loop(RecordingLink::default(), status("OFFBOARD", true)).await;

    tx.commands.send(Twist { linear_speed: 2.0, yaw_rate: 0.3 }).await.unwrap();
    let r = lp.tick().await;
    assert_eq!(r.phase, Phase::Steady);
    assert_eq!(thrust(&r), 2.0);
    assert_eq!(lp.heading(), 0.0);

    // t = 0.2 s
    let r = step(&mut lp, 4).await;
    assert_eq!(thrust(&r), 2.0);
    assert!((lp.heading() - 0.06).abs() < 1e-4, "heading {}", lp.heading());
    let yaw = r.published.unwrap().0.yaw();
    assert!((yaw - 0.06).abs() < 1e-4);

    // t = 0.5 s, age equals the threshold: still fresh
    let r = step(&mut lp, 6).await;
    assert_eq!(thrust(&r), 2.0);
    assert!((lp.heading() - 0.15).abs() < 1e-4);

    // t = 0.55 s: stale
    let r = step(&mut lp, 1).await;
    assert_eq!(thrust(&r), 0.0);
    let frozen = lp.heading();
    assert!((frozen - 0.15).abs() < 1e-4);

    // t = 0.8 s
    let r = step(&mut lp, 5).await;
    assert_eq!(thrust(&r), 0.0);
    assert_eq!(lp.heading(), frozen);

    let kept = lp.ingest().latest().expect("command kept");
    assert_eq!(kept.linear_speed, 2.0);
    assert_eq!(kept.yaw_rate, 0.3);
    assert!(lp.link().calls.is_empty());
}

#[tokio::test(start_paused = true)]
async fn fresh_command_resumes_from_frozen_heading() {
    let (mut lp, tx) = steady_loop(RecordingLink::default(), status("OFFBOARD", true)).await;

    tx.commands.send(Twist { linear_speed: 1.0, yaw_rate: 0.5 }).await.unwrap();
    lp.tick().await;
    step(&mut lp, 20).await;
    let frozen = lp.heading();
    assert!((frozen - 0.25).abs() < 1e-4, "heading {}", frozen);

    tx.commands.send(Twist { linear_speed: 0.7, yaw_rate: -0.2 }).await.unwrap();
    let r = step(&mut lp, 1).await;
    assert_eq!(thrust(&r), 0.7);
    let r = step(&mut lp, 10).await;
    assert_eq!(thrust(&r), 0.7);
    assert!((lp.heading() - (frozen - 0.2 * 0.55)).abs() < 1e-4, "heading {}", lp.heading());
}

#[tokio::test(start_paused = true)]
async fn no_command_ever_publishes_zero() {
    let (mut lp, _tx) = steady_loop(RecordingLink::default(), status("OFFBOARD", true)).await;
    for _ in 0..30 {
        let r = lp.tick().await;
        assert_eq!(thrust(&r), 0.0);
        assert_eq!(lp.heading(), 0.0);
        advance(TICK).await;
    }
    assert_eq!(lp.link().thrusts.len(), 31);
}

#[tokio::test(start_paused = true)]
async fn only_last_queued_command_counts() {
    let (mut lp, tx) = steady_loop(RecordingLink::default(), status("OFFBOARD", true)).await;

    for speed in [0.1_f32, 0.2, 0.3] {
        tx.commands.send(Twist { linear_speed: speed, yaw_rate: 0.0 }).await.unwrap();
    }
    let r = lp.tick().await;
    assert_eq!(thrust(&r), 0.3);
}
