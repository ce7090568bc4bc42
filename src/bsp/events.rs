// src/bsp/events.rs
//! Vertices touched by the current splitter, ordered by their position
//! along it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;

#[derive(Debug, Clone, Copy)]
struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Distance {}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One touched vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub distance: f64,
    pub vertex: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EventTree {
    events: BTreeMap<Distance, usize>,
}

impl EventTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Records `vertex` at `distance` unless something is already there.
    pub fn insert(&mut self, distance: f64, vertex: usize) {
        self.events.entry(Distance(distance)).or_insert(vertex);
    }

    pub fn find(&self, distance: f64) -> Option<Event> {
        self.events
            .get(&Distance(distance))
            .map(|&vertex| Event { distance, vertex })
    }

    pub fn successor(&self, distance: f64) -> Option<Event> {
        self.events
            .range((Bound::Excluded(Distance(distance)), Bound::Unbounded))
            .next()
            .map(|(d, &vertex)| Event { distance: d.0, vertex })
    }

    pub fn predecessor(&self, distance: f64) -> Option<Event> {
        self.events
            .range((Bound::Unbounded, Bound::Excluded(Distance(distance))))
            .next_back()
            .map(|(d, &vertex)| Event { distance: d.0, vertex })
    }

    /// All events, nearest the splitter's origin first.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.events
            .iter()
            .map(|(d, &vertex)| Event { distance: d.0, vertex })
    }
}
