//! Maps total points to a title tier. Pure lookup, no state; the cached
//! `users.title_id` column is kept in sync by every point-crediting write.

#[derive(Debug, PartialEq, Eq)]
pub struct TitleTier {
    pub id: i32,
    pub name: &'static str,
    pub min_points: i32,
    /// Some tiers carry a claimable reward.
    pub reward: Option<&'static str>,
}

pub const TITLES: &[TitleTier] = &[
    TitleTier {
        id: 1,
        name: "Novice",
        min_points: 0,
        reward: None,
    },
    TitleTier {
        id: 2,
        name: "Reader",
        min_points: 100,
        reward: None,
    },
    TitleTier {
        id: 3,
        name: "Bookworm",
        min_points: 300,
        reward: Some("Digital certificate"),
    },
    TitleTier {
        id: 4,
        name: "Wordsmith",
        min_points: 600,
        reward: None,
    },
    TitleTier {
        id: 5,
        name: "Scholar",
        min_points: 1000,
        reward: Some("Canva Pro for a week"),
    },
    TitleTier {
        id: 6,
        name: "Sage",
        min_points: 1500,
        reward: None,
    },
    TitleTier {
        id: 7,
        name: "Philosopher",
        min_points: 2500,
        reward: Some("Canva Pro for a month"),
    },
    TitleTier {
        id: 8,
        name: "Legend",
        min_points: 4000,
        reward: None,
    },
    TitleTier {
        id: 9,
        name: "Genius",
        min_points: 6000,
        reward: Some("Canva Pro for 3 months"),
    },
    TitleTier {
        id: 10,
        name: "Immortal",
        min_points: 10000,
        reward: Some("Special reward"),
    },
];

pub fn title_for_points(points: i32) -> &'static TitleTier {
    TITLES
        .iter()
        .rev()
        .find(|t| points >= t.min_points)
        .unwrap_or(&TITLES[0])
}

/// The next tier above `points` and how many points away it is.
pub fn next_title(points: i32) -> Option<(&'static TitleTier, i32)> {
    TITLES
        .iter()
        .find(|t| t.min_points > points)
        .map(|t| (t, t.min_points - points))
}

pub fn find_reward_tier(name: &str) -> Option<&'static TitleTier> {
    TITLES
        .iter()
        .find(|t| t.reward.is_some() && t.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_boundaries() {
        assert_eq!(title_for_points(0).name, "Novice");
        assert_eq!(title_for_points(99).name, "Novice");
        assert_eq!(title_for_points(100).name, "Reader");
        assert_eq!(title_for_points(299).name, "Reader");
        assert_eq!(title_for_points(300).name, "Bookworm");
        assert_eq!(title_for_points(9999).name, "Genius");
        assert_eq!(title_for_points(10000).name, "Immortal");
        assert_eq!(title_for_points(50000).name, "Immortal");
    }

    #[test]
    fn test_titles_ordered_by_min_points() {
        for pair in TITLES.windows(2) {
            assert!(pair[0].min_points < pair[1].min_points);
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn test_next_title_distance() {
        let (next, needed) = next_title(250).unwrap();
        assert_eq!(next.name, "Bookworm");
        assert_eq!(needed, 50);

        assert!(next_title(10000).is_none());
    }

    #[test]
    fn test_find_reward_tier_skips_rewardless_tiers() {
        assert!(find_reward_tier("Bookworm").is_some());
        assert!(find_reward_tier("bookworm").is_some());
        assert!(find_reward_tier("Reader").is_none());
        assert!(find_reward_tier("nonsense").is_none());
    }
}
