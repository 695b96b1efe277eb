//! Style calibration: maps the audience and tone enums to the descriptors
//! the model sees in free-generation mode.
//!
//! Descriptors pair the RedNote community slang with an English gloss so the
//! model gets the register right for Chinese-language posts.

use crate::models::settings::{Audience, Tone};

/// Natural-language descriptor for a target audience.
pub fn audience_descriptor(audience: Audience) -> &'static str {
    match audience {
        Audience::General => "大众 (General Audience)",
        Audience::Students => "00后/学生党 (Gen Z Students)",
        Audience::OfficeWorkers => "打工人/早八人 (Office Workers)",
        Audience::Parents => "宝妈/奶爸 (Parents)",
        Audience::Couples => "情侣/恋爱中 (Couples)",
        Audience::Photographers => "摄影佬/互勉 (Photographers)",
        Audience::YoungWomen => "精致女生/独居 (Young Women)",
    }
}

/// Natural-language descriptor for a content tone.
pub fn tone_descriptor(tone: Tone) -> &'static str {
    match tone {
        Tone::Authentic => "口语化/碎碎念 (Casual/Vlogging)",
        Tone::Emotional => "情绪宣泄/深夜EMO (Emotional/Vibe)",
        Tone::Informative => "干货/避坑指南 (Tips/Guide)",
        Tone::Humorous => "搞笑女/发疯文学 (Funny/Meme)",
        Tone::News => "吃瓜/震惊体 (Gossip/News)",
    }
}

/// Every descriptor in the table, audiences first.
#[cfg(test)]
pub fn all_descriptors() -> impl Iterator<Item = &'static str> {
    Audience::ALL
        .into_iter()
        .map(audience_descriptor)
        .chain(Tone::ALL.into_iter().map(tone_descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_audience_descriptors_are_distinct() {
        let unique: HashSet<_> = Audience::ALL.into_iter().map(audience_descriptor).collect();
        assert_eq!(unique.len(), Audience::ALL.len());
    }

    #[test]
    fn test_tone_descriptors_are_distinct() {
        let unique: HashSet<_> = Tone::ALL.into_iter().map(tone_descriptor).collect();
        assert_eq!(unique.len(), Tone::ALL.len());
    }

    #[test]
    fn test_humorous_students_descriptors() {
        assert!(tone_descriptor(Tone::Humorous).contains("Funny/Meme"));
        assert!(audience_descriptor(Audience::Students).contains("Gen Z Students"));
    }

    #[test]
    fn test_all_descriptors_covers_table() {
        assert_eq!(all_descriptors().count(), 12);
    }
}
