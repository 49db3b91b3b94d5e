use std::time::Duration;

use vasex_core::TrialConfig;
use vasex_experiment::manifest::ManifestEntry;
use vasex_experiment::{ApproxMeasure, PointerKind, Session, SessionEvent, trials_from_manifest};
use vasex_timing::ManualTimer;

fn rate_all(session: &mut Session<ManualTimer, ApproxMeasure>, x_frac: f32) {
    let w = session.current().expect("running trial");
    let canvas = w.layout().canvas;
    let lines = w.layout().scales.lines;
    for line in lines {
        let x = canvas.x + line.x1 + x_frac * (line.x2 - line.x1);
        session.dispatch(PointerKind::Down, x, canvas.y + line.y);
        session.dispatch(PointerKind::Up, x, canvas.y + line.y);
    }
}

#[test]
fn runs_trials_in_order_and_collects_results() {
    let entries = vec![
        ManifestEntry {
            image: "stimuli/alcohol/001.jpg".into(),
            category: "alcohol".into(),
        },
        ManifestEntry {
            image: "stimuli/neutral/002.jpg".into(),
            category: "neutral".into(),
        },
    ];
    let trials = trials_from_manifest(&entries, &TrialConfig::default());
    let timer = ManualTimer::new();
    let mut session = Session::new(trials, timer.clone(), ApproxMeasure).unwrap();

    assert_eq!(
        session.start().unwrap(),
        vec![SessionEvent::TrialStarted { index: 0, total: 2 }]
    );

    rate_all(&mut session, 0.25);
    timer.advance(Duration::from_millis(800));
    assert!(session.click_confirm());

    let events = session.update().unwrap();
    assert_eq!(events.len(), 2);
    match &events[0] {
        SessionEvent::TrialFinished { index, record } => {
            assert_eq!(*index, 0);
            assert_eq!(record.library, "alcohol");
            assert_eq!(record.craving, Some(25));
            assert_eq!(record.rt, 800);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(events[1], SessionEvent::TrialStarted { index: 1, total: 2 });
    assert_eq!(session.progress(), (1, 2));

    // The new trial starts fresh, with its own clock origin.
    assert!(!session.current().unwrap().confirm_enabled());
    rate_all(&mut session, 1.0);
    timer.advance(Duration::from_millis(300));
    assert!(session.click_confirm());

    let events = session.update().unwrap();
    assert!(matches!(events.last(), Some(SessionEvent::SessionComplete)));
    assert!(session.is_complete());
    assert!(session.current().is_none());

    let results = session.into_results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].image_file, "002.jpg");
    assert_eq!(results[1].arousal, Some(100));
    assert_eq!(results[1].rt, 300);
}

#[test]
fn update_without_confirm_is_quiet() {
    let mut session =
        Session::new(vec![TrialConfig::default()], ManualTimer::new(), ApproxMeasure).unwrap();
    session.start().unwrap();
    rate_all(&mut session, 0.5);
    assert!(session.update().unwrap().is_empty());
    assert!(!session.is_complete());
}

#[test]
fn reaction_time_counts_from_first_present() {
    let entries = vec![
        ManifestEntry {
            image: "stimuli/alcohol/001.jpg".into(),
            category: "alcohol".into(),
        },
        ManifestEntry {
            image: "stimuli/neutral/002.jpg".into(),
            category: "neutral".into(),
        },
    ];
    let timer = ManualTimer::new();
    let mut session = Session::new(
        trials_from_manifest(&entries, &TrialConfig::default()),
        timer.clone(),
        ApproxMeasure,
    )
    .unwrap();
    session.start().unwrap();

    // stimulus decode happens between start and the first frame
    timer.advance(Duration::from_millis(120));
    session.mark_presented();
    rate_all(&mut session, 0.5);
    timer.advance(Duration::from_millis(900));
    assert!(session.click_confirm());
    session.update().unwrap();

    timer.advance(Duration::from_millis(75));
    session.mark_presented();
    // redraws after the first one do not move the origin
    timer.advance(Duration::from_millis(200));
    session.mark_presented();
    rate_all(&mut session, 0.5);
    timer.advance(Duration::from_millis(100));
    assert!(session.click_confirm());
    session.update().unwrap();

    let rts: Vec<u64> = session.results().iter().map(|r| r.rt).collect();
    assert_eq!(rts, vec![900, 300]);
}
