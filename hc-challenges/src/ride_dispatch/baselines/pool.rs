use crate::ride_dispatch::Ride;

/// Rides that are neither assigned nor expired.
///
/// Scan order is by earliest start, latest first, with input order kept for
/// equal starts. Removal is O(1) and never reorders the remaining rides.
/// Expiry walks a deadline-sorted cursor, so each ride is inspected once.
#[derive(Debug, Clone)]
pub struct ActivePool {
    head: Option<usize>,
    next: Vec<Option<usize>>,
    prev: Vec<Option<usize>>,
    active: Vec<bool>,
    len: usize,
    by_deadline: Vec<usize>,
    expired: usize,
}

impl ActivePool {
    pub fn new(rides: &[Ride]) -> Self {
        let mut order: Vec<usize> = (0..rides.len()).collect();
        order.sort_by(|&a, &b| rides[b].earliest_start.cmp(&rides[a].earliest_start));

        let mut next = vec![None; rides.len()];
        let mut prev = vec![None; rides.len()];
        for pair in order.windows(2) {
            next[pair[0]] = Some(pair[1]);
            prev[pair[1]] = Some(pair[0]);
        }

        let mut by_deadline: Vec<usize> = (0..rides.len()).collect();
        by_deadline.sort_by_key(|&ride| rides[ride].latest_finish);

        Self {
            head: order.first().copied(),
            next,
            prev,
            active: vec![true; rides.len()],
            len: rides.len(),
            by_deadline,
            expired: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Active ride indices in scan order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.head, move |&ride| self.next[ride])
    }

    pub fn remove(&mut self, ride: usize) {
        if !self.active[ride] {
            return;
        }
        match self.prev[ride] {
            Some(prev) => self.next[prev] = self.next[ride],
            None => self.head = self.next[ride],
        }
        if let Some(next) = self.next[ride] {
            self.prev[next] = self.prev[ride];
        }
        self.active[ride] = false;
        self.len -= 1;
    }

    /// Drops every ride whose deadline is at or before `step` and returns
    /// how many were still active.
    pub fn expire(&mut self, rides: &[Ride], step: i64) -> usize {
        let mut removed = 0;
        while let Some(&ride) = self.by_deadline.get(self.expired) {
            if rides[ride].latest_finish > step {
                break;
            }
            if self.active[ride] {
                self.remove(ride);
                removed += 1;
            }
            self.expired += 1;
        }
        removed
    }
}
