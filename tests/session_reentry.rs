#![cfg(unix)]

mod support;

use std::time::{Duration, Instant};

use fxpipe::{EffectSpec, FilterSession, FxPipeError, SessionOpts};
use support::{copy_to_output_body, gradient_buffer, temp_dir, write_bmp_fixture, write_stub};

#[test]
fn second_trigger_while_in_flight_is_rejected() {
    let dir = temp_dir("reentry_busy");
    let cache = dir.join("cache");

    let effect_result = gradient_buffer(2, 2);
    let fixture = dir.join("effect_result.bmp");
    write_bmp_fixture(&fixture, &effect_result);
    // Long enough to observe the in-flight window reliably.
    let body = format!("sleep 2\n{}", copy_to_output_body(&fixture));
    let stub = write_stub(&dir, "fx_slow", &body);

    let session = FilterSession::new(SessionOpts::new(&stub, &cache)).unwrap();
    let input = gradient_buffer(3, 3);
    let spec = EffectSpec::new("fx_noop 1");

    let job = session
        .apply_in_background(input.clone(), spec.clone())
        .unwrap();
    assert!(session.is_in_flight());

    let err = session.apply(&input, &spec).unwrap_err();
    assert!(matches!(err, FxPipeError::Validation(_)), "got {err}");
    let err = session
        .apply_in_background(input.clone(), spec.clone())
        .unwrap_err();
    assert!(matches!(err, FxPipeError::Validation(_)), "got {err}");

    assert_eq!(job.wait().unwrap(), effect_result);

    // Guard released: the session is usable again.
    assert_eq!(session.apply(&input, &spec).unwrap(), effect_result);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn try_wait_delivers_after_completion() {
    let dir = temp_dir("reentry_try_wait");
    let cache = dir.join("cache");

    let effect_result = gradient_buffer(2, 1);
    let fixture = dir.join("effect_result.bmp");
    write_bmp_fixture(&fixture, &effect_result);
    let stub = write_stub(&dir, "fx_quick", &copy_to_output_body(&fixture));

    let session = FilterSession::new(SessionOpts::new(&stub, &cache)).unwrap();
    let job = session
        .apply_in_background(gradient_buffer(2, 2), EffectSpec::new("fx_noop 1"))
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(30);
    let result = loop {
        if let Some(result) = job.try_wait() {
            break result;
        }
        assert!(Instant::now() < deadline, "background job never finished");
        std::thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(result.unwrap(), effect_result);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn background_failure_leaves_session_reusable() {
    let dir = temp_dir("reentry_failure");
    let cache = dir.join("cache");

    let failing = write_stub(&dir, "fx_broken", "exit 3");
    let session = FilterSession::new(SessionOpts::new(&failing, &cache)).unwrap();

    let job = session
        .apply_in_background(gradient_buffer(2, 2), EffectSpec::new("fx_noop 1"))
        .unwrap();
    let err = job.wait().unwrap_err();
    assert!(matches!(err, FxPipeError::Effect(_)), "got {err}");
    assert!(!session.is_in_flight());

    std::fs::remove_dir_all(&dir).ok();
}
