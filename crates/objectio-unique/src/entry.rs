//! Registry entries and their guard words

use std::fmt;

/// Sentinel every guard word holds while an entry is intact
pub const GUARD_PATTERN: u64 = 0xdead_c0de_feed_f00d;

/// One live identifier
///
/// The owning map node stands in for the linkage field, so the guards sit
/// before the node, between node and value, and after the value.
#[derive(Debug)]
#[repr(C)]
pub(crate) struct Entry {
    guard1: u64,
    guard2: u64,
    value: u64,
    guard3: u64,
}

impl Entry {
    pub(crate) const fn new(value: u64) -> Self {
        Self {
            guard1: GUARD_PATTERN,
            guard2: GUARD_PATTERN,
            value,
            guard3: GUARD_PATTERN,
        }
    }

    pub(crate) const fn value(&self) -> u64 {
        self.value
    }

    const fn guards(&self) -> [u64; 3] {
        [self.guard1, self.guard2, self.guard3]
    }

    /// Compare all three guards against the sentinel
    pub(crate) fn check(&self) -> Result<(), Corruption> {
        let guards = self.guards();
        if guards.iter().all(|&g| g == GUARD_PATTERN) {
            Ok(())
        } else {
            Err(Corruption {
                value: self.value,
                guards,
            })
        }
    }

    /// Overwrite guard `index` (1-based)
    #[cfg(test)]
    pub(crate) fn corrupt(&mut self, index: usize, word: u64) {
        match index {
            1 => self.guard1 = word,
            2 => self.guard2 = word,
            3 => self.guard3 = word,
            _ => panic!("no guard {index}"),
        }
    }
}

/// Observed guard words of an entry that failed its check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Corruption {
    pub value: u64,
    pub guards: [u64; 3],
}

impl Corruption {
    /// 1-based indices of the guards that no longer hold the sentinel
    pub(crate) fn corrupted(&self) -> impl Iterator<Item = usize> + '_ {
        self.guards
            .iter()
            .enumerate()
            .filter(|&(_, &g)| g != GUARD_PATTERN)
            .map(|(i, _)| i + 1)
    }
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry {:#x}:", self.value)?;
        for index in self.corrupted() {
            write!(f, " guard{index}={:#018x}", self.guards[index - 1])?;
        }
        write!(
            f,
            " (guards {:#018x} {:#018x} {:#018x})",
            self.guards[0], self.guards[1], self.guards[2]
        )
    }
}

/// Point in an insert or remove at which guards are verified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CheckSite {
    /// Live entry hit by a colliding candidate
    Collision,
    BeforeInsert,
    AfterInsert,
    BeforeRemove,
    AfterRemove,
}

impl fmt::Display for CheckSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Collision => "on collision",
            Self::BeforeInsert => "before insert",
            Self::AfterInsert => "after insert",
            Self::BeforeRemove => "before remove",
            Self::AfterRemove => "after remove",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_intact() {
        let entry = Entry::new(42);
        assert_eq!(entry.value(), 42);
        assert!(entry.check().is_ok());
    }

    #[test]
    fn test_corrupted_guard_is_reported() {
        let mut entry = Entry::new(0x1234);
        entry.corrupt(2, 0);

        let corruption = entry.check().unwrap_err();
        assert_eq!(corruption.value, 0x1234);
        assert_eq!(corruption.guards, [GUARD_PATTERN, 0, GUARD_PATTERN]);
        assert_eq!(corruption.corrupted().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_corruption_display_names_guards() {
        let mut entry = Entry::new(0xab);
        entry.corrupt(1, 0x1);
        entry.corrupt(3, 0xffff);

        let msg = entry.check().unwrap_err().to_string();
        assert!(msg.starts_with("entry 0xab:"));
        assert!(msg.contains("guard1=0x0000000000000001"));
        assert!(msg.contains("guard3=0x000000000000ffff"));
        assert!(!msg.contains("guard2="));
        assert!(msg.contains("0xdeadc0defeedf00d"));
    }

    #[test]
    fn test_check_site_display() {
        assert_eq!(CheckSite::BeforeInsert.to_string(), "before insert");
        assert_eq!(CheckSite::AfterRemove.to_string(), "after remove");
    }
}
