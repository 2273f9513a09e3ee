use simstats::{ClockSource, SimClock};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Event {
    Arrival,
    ServiceCompletion,
}

/// A future event list on top of the simulation clock.
///
/// Events due at the same time fire in the order they were scheduled.
pub struct Simulator {
    clock: SimClock,
    /// (due time, sequence number, event)
    pending: BinaryHeap<Reverse<(i64, u64, Event)>>,
    next_seq: u64,
}

impl Simulator {
    pub fn new(clock: SimClock) -> Simulator {
        Simulator {
            clock,
            pending: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Schedules `event` to happen `delay` ticks from now
    pub fn schedule(&mut self, delay: i64, event: Event) {
        let due = self.now() + delay.max(0);
        self.pending.push(Reverse((due, self.next_seq, event)));
        self.next_seq += 1;
    }

    /// Advances the clock to the next event and returns it
    pub fn next_event(&mut self) -> Result<Option<Event>, simstats::Error> {
        match self.pending.pop() {
            None => Ok(None),
            Some(Reverse((due, _, event))) => {
                self.clock.advance_to(due)?;
                Ok(Some(event))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_time_order() {
        let clock = SimClock::new();
        let mut sim = Simulator::new(clock.clone());
        sim.schedule(5, Event::ServiceCompletion);
        sim.schedule(2, Event::Arrival);
        sim.schedule(5, Event::Arrival);
        assert_eq!(sim.next_event().unwrap(), Some(Event::Arrival));
        assert_eq!(clock.now(), 2);
        assert_eq!(sim.next_event().unwrap(), Some(Event::ServiceCompletion));
        assert_eq!(sim.next_event().unwrap(), Some(Event::Arrival));
        assert_eq!(clock.now(), 5);
        assert_eq!(sim.next_event().unwrap(), None);
    }

    #[test]
    fn delays_are_relative() {
        let mut sim = Simulator::new(SimClock::starting_at(100));
        sim.schedule(0, Event::Arrival);
        sim.schedule(-3, Event::ServiceCompletion);
        assert_eq!(sim.next_event().unwrap(), Some(Event::Arrival));
        assert_eq!(sim.now(), 100);
        assert_eq!(sim.next_event().unwrap(), Some(Event::ServiceCompletion));
        assert_eq!(sim.now(), 100);
    }
}
