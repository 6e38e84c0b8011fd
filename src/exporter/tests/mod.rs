use super::*;
use crate::exporter::test_helpers::{
    MockSource, board, card, closed_card, label, list, member, test_config, test_exporter,
};
use std::path::Path;
use tempfile::TempDir;


/// Two lists, three cards, one of them archived
fn sample_source() -> MockSource {
    let mut home = board("b1", "Home Projects");
    home.prefs.background_image = Some("https://img.example.com/bg/mountains.jpg".into());

    MockSource::new(home)
        .with_lists(vec![list("l1", "To Do"), list("l2", "Done")])
        .with_labels(vec![label("lb1", "Urgent", "red")])
        .with_members(vec![member("m1", "Ada Lovelace")])
        .with_cards(vec![
            card("c1", "Paint fence", "l1"),
            card("c2", "Fix sink", "l1"),
            closed_card("c3", "Old shed", "l2"),
        ])
        .with_card_labels("c1", vec![label("lb1", "Urgent", "red")])
        .with_file("https://img.example.com/bg/mountains.jpg", b"jpeg-bytes")
}

fn collect_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn assert_card_files(dir: &Path) {
    for file in [
        "CardDescription.md",
        "attachments/URL-Attachments.md",
        "CardComments.md",
        "CardUsers.md",
        "CardLabels.md",
        "CardHistory.md",
        "CardDueDate.md",
        "CardStartDate.md",
    ] {
        assert!(dir.join(file).is_file(), "{} missing in {}", file, dir.display());
    }
    assert!(dir.join("checklists").is_dir());
}
