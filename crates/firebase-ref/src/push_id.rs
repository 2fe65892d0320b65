//! Chronologically ordered child names for pushed values.
//!
//! An id is 20 characters drawn from an alphabet whose ASCII order matches
//! its numeric order: 8 characters of millisecond timestamp followed by 12
//! random characters. Ids generated later sort after earlier ones, and two
//! ids generated by the same [`PushIdGenerator`] within one millisecond are
//! still strictly increasing.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Length of every push id.
pub const PUSH_ID_LEN: usize = TIME_CHARS + RANDOM_CHARS;

/// Stateful push id source.
#[derive(Debug, Clone, Default)]
pub struct PushIdGenerator {
    last_time: Option<u64>,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for the current wall-clock time.
    pub fn next_id(&mut self) -> String {
        self.generate(now_millis(), &mut rand::thread_rng())
    }

    /// Next id for timestamp `now` (milliseconds since the epoch).
    pub fn generate<R: Rng + ?Sized>(&mut self, now: u64, rng: &mut R) -> String {
        if self.last_time == Some(now) {
            increment(&mut self.last_random);
        } else {
            for slot in self.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        }
        self.last_time = Some(now);
        encode(now, &self.last_random)
    }
}

/// Stateless push id for timestamp `now`.
///
/// # Example
///
/// ```
/// use firebase_ref::push_id::{generate_push_id, PUSH_ID_LEN};
///
/// let mut rng = rand::thread_rng();
/// let early = generate_push_id(1_000, &mut rng);
/// let late = generate_push_id(2_000, &mut rng);
/// assert_eq!(early.len(), PUSH_ID_LEN);
/// assert!(early < late);
/// ```
pub fn generate_push_id<R: Rng + ?Sized>(now: u64, rng: &mut R) -> String {
    let mut random = [0u8; RANDOM_CHARS];
    for slot in random.iter_mut() {
        *slot = rng.gen_range(0..64);
    }
    encode(now, &random)
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn encode(now: u64, random: &[u8; RANDOM_CHARS]) -> String {
    let mut time_chars = [0u8; TIME_CHARS];
    let mut remaining = now;
    for slot in time_chars.iter_mut().rev() {
        *slot = PUSH_CHARS[(remaining % 64) as usize];
        remaining /= 64;
    }
    let mut id = String::with_capacity(PUSH_ID_LEN);
    id.extend(time_chars.iter().map(|&b| b as char));
    id.extend(random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
    id
}

/// Add one to the random digits, carrying to the left.
fn increment(random: &mut [u8; RANDOM_CHARS]) {
    for digit in random.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
