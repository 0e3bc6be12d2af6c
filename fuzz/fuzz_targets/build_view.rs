#![no_main]

use bulto_core::model::ShipmentSnapshot;
use bulto_core::policy::StatusPolicy;
use bulto_core::timeline::day_bands;
use bulto_core::view::ShipmentView;
use chrono::Utc;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = serde_json::from_slice::<ShipmentSnapshot>(data) else {
        return;
    };
    let view = ShipmentView::build(&snapshot, &StatusPolicy::builtin(), &Utc);

    let timeline = &view.timeline;
    assert!(timeline.groups.iter().filter(|g| g.is_latest).count() <= 1);
    assert!(
        timeline
            .groups
            .windows(2)
            .all(|w| w[0].anchor.timestamp >= w[1].anchor.timestamp)
    );
    assert_eq!(day_bands(&timeline.groups).len(), timeline.groups.len());
    for package in &view.packages {
        assert!(package.timeline.groups.iter().filter(|g| g.is_latest).count() <= 1);
    }
});
