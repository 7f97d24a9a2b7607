//! Area name lookup, keyed by `(episode, area index)`, per spec §Glossary.

const EPISODE_1: &[(u32, &str)] = &[
    (0, "Pioneer 2"),
    (1, "Forest"),
    (2, "Forest"),
    (3, "Caves"),
    (4, "Caves"),
    (5, "Caves"),
    (6, "Mines"),
    (7, "Mines"),
    (8, "Ruins"),
    (9, "Ruins"),
    (10, "Ruins"),
    (11, "Under the Dome"),
    (12, "Underground Channel"),
    (13, "Monitor Room"),
    (15, "Visual Lobby"),
    (16, "VR Spaceship \u{3b1}"),
    (17, "VR Temple \u{3b1}"),
];

const EPISODE_2: &[(u32, &str)] = &[
    (0, "Lab"),
    (1, "VR Temple \u{3b1}"),
    (2, "VR Temple \u{3b2}"),
    (3, "VR Spaceship \u{3b1}"),
    (4, "VR Spaceship \u{3b2}"),
    (5, "Central Control"),
    (6, "Jungle North"),
    (7, "Jungle East"),
    (8, "Mountain"),
    (9, "Seaside"),
    (10, "Seabed Upper"),
    (11, "Seabed Lower"),
    (12, "Cliffs"),
    (13, "Test Subject Disposal"),
    (14, "VR Temple Final"),
    (15, "VR Spaceship Final"),
    (16, "Seaside Night"),
    (17, "Control Tower"),
];

/// Look up an area's display name. Returns `None` for an unmapped index
/// rather than panicking, since a corrupted `.dat` file can carry any
/// `area` value.
pub fn area_name(episode: u8, area: u32) -> Option<&'static str> {
    let table = match episode {
        0 => EPISODE_1,
        1 => EPISODE_2,
        _ => return None,
    };
    table
        .iter()
        .find(|(index, _)| *index == area)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_areas_resolve() {
        assert_eq!(area_name(0, 0), Some("Pioneer 2"));
        assert_eq!(area_name(1, 5), Some("Central Control"));
    }

    #[test]
    fn unmapped_area_is_none() {
        assert_eq!(area_name(0, 14), None);
        assert_eq!(area_name(2, 0), None);
    }
}
