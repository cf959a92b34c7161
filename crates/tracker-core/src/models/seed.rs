//! Starter records for fresh anonymous sessions

use super::{Priority, RecordDraft};

const STARTER_SET: [(&str, &str, &str, Priority, &str); 5] = [
    (
        "iPhone 15 Pro",
        "Apple",
        "📱 Smartphone",
        Priority::Urgent,
        "Test camera and performance",
    ),
    (
        "Roomba j7+",
        "iRobot",
        "🤖 Robot Vacuum",
        Priority::Medium,
        "Test smart navigation",
    ),
    (
        "MacBook Air M2",
        "Apple",
        "💻 Computer",
        Priority::Urgent,
        "Test battery life and speed",
    ),
    (
        "Anker PowerCore",
        "Anker",
        "🔋 Battery",
        Priority::Low,
        "Test charging capacity",
    ),
    (
        "Worx Landroid",
        "Worx",
        "🌱 Robot Mower",
        Priority::Medium,
        "Test cutting precision",
    ),
];

/// The fixed starter set seeded once for a fresh anonymous session.
pub fn starter_drafts() -> Vec<RecordDraft> {
    STARTER_SET
        .iter()
        .map(|&(name, brand, category, priority, notes)| RecordDraft {
            name: name.to_string(),
            brand: brand.to_string(),
            category: category.to_string(),
            priority,
            notes: notes.to_string(),
            due_date: None,
            photo: None,
        })
        .collect()
}
