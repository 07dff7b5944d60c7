use std::collections::VecDeque;
use std::path::Path;

use glam::DVec3;
use sky_core::{CoreError, ParticleKind, SimTime};

use crate::error::{SourceError, SourceResult};

/// One predetermined future emission.
///
/// Entries come either from a bulk file load at setup or from the physics
/// collaborator reporting a delayed decay observed during transport.
#[derive(Debug, Clone)]
pub struct EventListEntry {
    /// Absolute emission time.
    pub time: SimTime,
    /// Particle kind to emit.
    pub kind: ParticleKind,
    /// Start position in cm.
    pub position: DVec3,
    /// Unit momentum direction.
    pub direction: DVec3,
    /// Unit polarization vector.
    pub polarization: DVec3,
    /// Energy in keV.
    pub energy_kev: f64,
    /// Name of the volume the emission belongs to.
    pub volume: String,
}

/// A time-ordered queue of predetermined emissions.
///
/// The queue is always sorted ascending in time; out-of-order insertion
/// (decays are reported in transport order, not time order) is handled by
/// [`EventList::insert`].
#[derive(Debug, Clone, Default)]
pub struct EventList {
    entries: VecDeque<EventListEntry>,
}

impl EventList {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a queue from a whitespace-separated file with records
    ///
    /// ```text
    /// <time> <kind> <energy_keV> <px> <py> <pz> <dx> <dy> <dz> <polx> <poly> <polz> <volume>
    /// ```
    ///
    /// File entries must already be time-sorted; an unsorted file is a
    /// setup error.
    pub fn from_file(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            file: label.clone(),
            source,
        })?;
        let mut list = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry = parse_entry(line).map_err(|reason| CoreError::MalformedRecord {
                file: label.clone(),
                line: idx + 1,
                reason,
            })?;
            if list.entries.back().is_some_and(|last| entry.time < last.time) {
                return Err(SourceError::UnsortedEventList {
                    file: label,
                    line: idx + 1,
                });
            }
            list.entries.push_back(entry);
        }
        Ok(list)
    }

    /// Insert an entry, keeping the queue time-sorted.
    pub fn insert(&mut self, entry: EventListEntry) {
        let at = self.entries.partition_point(|e| e.time <= entry.time);
        self.entries.insert(at, entry);
    }

    /// Time of the next emission, if any.
    pub fn next_time(&self) -> Option<SimTime> {
        self.entries.front().map(|e| e.time)
    }

    /// Remove and return the earliest entry.
    pub fn pop(&mut self) -> Option<EventListEntry> {
        self.entries.pop_front()
    }

    /// Number of queued emissions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_entry(line: &str) -> Result<EventListEntry, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 13 {
        return Err(format!("expected 13 fields, got {}", fields.len()));
    }
    let num = |s: &str| -> Result<f64, String> {
        s.parse().map_err(|_| format!("not a number: '{s}'"))
    };
    let kind = ParticleKind::from_name(fields[1])
        .ok_or_else(|| format!("unknown particle name '{}'", fields[1]))?;
    Ok(EventListEntry {
        time: SimTime::from_secs(num(fields[0])?),
        kind,
        energy_kev: num(fields[2])?,
        position: DVec3::new(num(fields[3])?, num(fields[4])?, num(fields[5])?),
        direction: DVec3::new(num(fields[6])?, num(fields[7])?, num(fields[8])?).normalize(),
        polarization: DVec3::new(num(fields[9])?, num(fields[10])?, num(fields[11])?),
        volume: fields[12].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry(t: f64) -> EventListEntry {
        EventListEntry {
            time: SimTime::from_secs(t),
            kind: ParticleKind::Gamma,
            position: DVec3::ZERO,
            direction: DVec3::Z,
            polarization: DVec3::X,
            energy_kev: 511.0,
            volume: "det".into(),
        }
    }

    #[test]
    fn insertion_keeps_time_order() {
        // Decays arrive in transport order 1, 5, 3; pops must come out 1, 3, 5.
        let mut list = EventList::new();
        list.insert(entry(1.0));
        list.insert(entry(5.0));
        list.insert(entry(3.0));
        let order: Vec<f64> = std::iter::from_fn(|| list.pop())
            .map(|e| e.time.as_secs())
            .collect();
        assert_eq!(order, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn equal_times_preserve_insertion_order() {
        let mut list = EventList::new();
        let mut a = entry(2.0);
        a.volume = "first".into();
        let mut b = entry(2.0);
        b.volume = "second".into();
        list.insert(a);
        list.insert(b);
        assert_eq!(list.pop().unwrap().volume, "first");
        assert_eq!(list.pop().unwrap().volume, "second");
    }

    #[test]
    fn next_time_is_head() {
        let mut list = EventList::new();
        assert!(list.next_time().is_none());
        list.insert(entry(4.0));
        list.insert(entry(2.0));
        assert_eq!(list.next_time(), Some(SimTime::from_secs(2.0)));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn file_load_and_validation() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "# delayed emissions").unwrap();
        writeln!(f, "0.5 gamma 511.0 0 0 0 0 0 1 1 0 0 det").unwrap();
        writeln!(f, "1.5 e- 100.0 1 2 3 0 1 0 0 0 1 det").unwrap();
        let list = EventList::from_file(f.path()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.next_time(), Some(SimTime::from_secs(0.5)));
    }

    #[test]
    fn unsorted_file_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "2.0 gamma 511.0 0 0 0 0 0 1 1 0 0 det").unwrap();
        writeln!(f, "1.0 gamma 511.0 0 0 0 0 0 1 1 0 0 det").unwrap();
        let err = EventList::from_file(f.path()).unwrap_err();
        assert!(matches!(err, SourceError::UnsortedEventList { line: 2, .. }));
    }

    #[test]
    fn malformed_file_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "1.0 wizard 511.0 0 0 0 0 0 1 1 0 0 det").unwrap();
        let err = EventList::from_file(f.path()).unwrap_err();
        assert!(matches!(
            err,
            SourceError::Core(CoreError::MalformedRecord { line: 1, .. })
        ));
    }
}
