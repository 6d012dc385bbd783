//! The rotation-sweep retry loop.
//!
//! ## States
//!
//! ```text
//! Attempting(0) ──▶ Attempting(1) ──▶ … ──▶ Attempting(max-1) ──▶ Exhausted
//!       │                 │                        │
//!       └────────────────┴──── all slots resolved ┴──▶ Accepted
//! ```
//!
//! Every attempt reads all boxes at rotation `start + step * attempt`, even
//! boxes negative and odd boxes positive, into a fresh result. Nothing from
//! a rejected attempt carries into the next one; the schedule alone decides
//! the next rotation. When attempts run out the last result is returned as
//! a best-effort value.

use crate::config::{RotationSchedule, SolverConfig};
use crate::output::{CaptchaResult, SolveStatus, Symbol};
use crate::pipeline::preprocess::BinaryRaster;
use crate::pipeline::recognize::LetterReader;
use crate::pipeline::segment::LetterBox;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

/// Where the loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveState {
    /// About to run the given 0-based attempt.
    Attempting(u32),
    Accepted,
    Exhausted,
}

/// What the loop produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub result: CaptchaResult,
    pub status: SolveStatus,
    /// Attempts performed.
    pub attempts: u32,
    /// Letter reads issued.
    pub reads: usize,
}

/// Drive `reader` over `boxes` until every slot resolves or the schedule
/// runs out.
pub async fn solve_raster(
    reader: &dyn LetterReader,
    raster: &BinaryRaster,
    boxes: &[LetterBox],
    config: &SolverConfig,
) -> LoopOutcome {
    let schedule = &config.rotation;
    let expected = boxes.len();
    let progress = config.progress_callback.as_ref();

    if let Some(cb) = progress {
        cb.on_solve_start(expected, schedule.max_attempts);
    }

    let mut state = SolveState::Attempting(0);
    let mut last = CaptchaResult::unresolved(expected);
    let mut attempts = 0;

    loop {
        match state {
            SolveState::Attempting(attempt) if attempt >= schedule.max_attempts => {
                state = SolveState::Exhausted;
            }
            SolveState::Attempting(attempt) => {
                if let Some(cb) = progress {
                    cb.on_attempt_start(attempt, schedule.magnitude(attempt));
                }

                let result =
                    read_attempt(reader, raster, boxes, schedule, attempt, config.concurrency)
                        .await;
                attempts = attempt + 1;
                let resolved = result.resolved_count();

                if let Some(cb) = progress {
                    cb.on_attempt_complete(attempt, resolved, &result.marked());
                }

                if result.is_accepted(expected) {
                    info!("Captcha solved on attempt {}: {}", attempts, result);
                    state = SolveState::Accepted;
                } else {
                    info!(
                        "Attempt {}/{} at ±{}°: {} ({}/{} resolved), retrying",
                        attempts,
                        schedule.max_attempts,
                        schedule.magnitude(attempt),
                        result,
                        resolved,
                        expected
                    );
                    state = SolveState::Attempting(attempt + 1);
                }
                last = result;
            }
            SolveState::Accepted | SolveState::Exhausted => break,
        }
    }

    let status = if state == SolveState::Accepted {
        SolveStatus::Accepted
    } else {
        info!(
            "Captcha exhausted after {} attempts, best effort: {} ({}/{} resolved)",
            attempts,
            last,
            last.resolved_count(),
            expected
        );
        SolveStatus::Exhausted
    };

    if let Some(cb) = progress {
        cb.on_solve_complete(status == SolveStatus::Accepted, attempts);
    }

    LoopOutcome {
        result: last,
        status,
        attempts,
        reads: attempts as usize * expected,
    }
}

/// Read every box once at this attempt's rotation.
async fn read_attempt(
    reader: &dyn LetterReader,
    raster: &BinaryRaster,
    boxes: &[LetterBox],
    schedule: &RotationSchedule,
    attempt: u32,
    concurrency: usize,
) -> CaptchaResult {
    let mut reads: Vec<(usize, Symbol)> =
        stream::iter(boxes.iter().enumerate().map(|(index, letter)| {
            let angle = schedule.angle_for(attempt, index);
            async move {
                let symbol = reader
                    .read_letter(raster, letter, index, attempt, angle)
                    .await;
                debug!("Attempt {} letter {} at {}°: {}", attempt, index, angle, symbol);
                (index, symbol)
            }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    // Completion order is arbitrary when concurrency > 1
    reads.sort_by_key(|(index, _)| *index);
    CaptchaResult::new(reads.into_iter().map(|(_, symbol)| symbol).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::GrayImage;
    use std::sync::Mutex;

    type Script = dyn Fn(u32, usize) -> Symbol + Send + Sync;

    /// Records every call; answers from a closure of (attempt, index).
    struct ScriptedReader {
        script: Box<Script>,
        calls: Mutex<Vec<(u32, usize, i32)>>,
    }

    impl ScriptedReader {
        fn new(script: impl Fn(u32, usize) -> Symbol + Send + Sync + 'static) -> Self {
            Self {
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(u32, usize, i32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LetterReader for ScriptedReader {
        async fn read_letter(
            &self,
            _raster: &BinaryRaster,
            _letter: &LetterBox,
            index: usize,
            attempt: u32,
            angle_deg: i32,
        ) -> Symbol {
            self.calls.lock().unwrap().push((attempt, index, angle_deg));
            (self.script)(attempt, index)
        }
    }

    fn fixture() -> (BinaryRaster, Vec<LetterBox>) {
        let raster = BinaryRaster::from_gray(&GrayImage::new(200, 40));
        let boxes = (0..6)
            .map(|i| LetterBox {
                left: 10 + i * 20,
                top: 0,
                width: 20,
                height: 40,
            })
            .collect();
        (raster, boxes)
    }

    fn letter(i: usize) -> Symbol {
        Symbol::Resolved(['A', 'B', 'C', 'D', 'E', 'F'][i])
    }

    #[tokio::test]
    async fn partial_results_exhaust_all_attempts() {
        let (raster, boxes) = fixture();
        let reader = ScriptedReader::new(|_, i| if i == 2 { Symbol::Placeholder } else { letter(i) });
        let outcome = solve_raster(&reader, &raster, &boxes, &SolverConfig::default()).await;

        assert_eq!(outcome.status, SolveStatus::Exhausted);
        assert_eq!(outcome.attempts, 12);
        assert_eq!(outcome.reads, 72);
        assert_eq!(reader.calls().len(), 72);
        assert_eq!(outcome.result.marked(), "AB_DEF");
        assert_eq!(outcome.result.text(), "ABDEF");
    }

    #[tokio::test]
    async fn acceptance_stops_the_sweep() {
        let (raster, boxes) = fixture();
        let reader = ScriptedReader::new(|attempt, i| {
            if attempt == 3 || i % 2 == 0 {
                letter(i)
            } else {
                Symbol::Placeholder
            }
        });
        let outcome = solve_raster(&reader, &raster, &boxes, &SolverConfig::default()).await;

        assert_eq!(outcome.status, SolveStatus::Accepted);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.result.text(), "ABCDEF");
        let calls = reader.calls();
        assert_eq!(calls.len(), 24);
        assert!(calls.iter().all(|(attempt, _, _)| *attempt <= 3));
    }

    #[tokio::test]
    async fn rotation_schedule_reaches_the_reader() {
        let (raster, boxes) = fixture();
        let reader = ScriptedReader::new(|_, _| Symbol::Placeholder);
        solve_raster(&reader, &raster, &boxes, &SolverConfig::default()).await;

        for (attempt, index, angle) in reader.calls() {
            let magnitude = 14 + 2 * attempt as i32;
            let expected = if index % 2 == 0 { -magnitude } else { magnitude };
            assert_eq!(angle, expected, "attempt {attempt} box {index}");
        }
        let calls = reader.calls();
        assert_eq!(calls[0], (0, 0, -14));
        assert_eq!(calls[1], (0, 1, 14));
        assert_eq!(calls[71], (11, 5, 36));
    }

    #[tokio::test]
    async fn results_do_not_leak_between_attempts() {
        // Attempt 0 reads boxes 0..5, attempt 1 reads only box 5; together
        // they would cover every slot.
        let (raster, boxes) = fixture();
        let reader = ScriptedReader::new(|attempt, i| match (attempt, i) {
            (0, i) if i < 5 => letter(i),
            (1, 5) => letter(5),
            _ => Symbol::Placeholder,
        });
        let config = SolverConfig::builder().max_attempts(2).build().unwrap();
        let outcome = solve_raster(&reader, &raster, &boxes, &config).await;

        assert_eq!(outcome.status, SolveStatus::Exhausted);
        assert_eq!(outcome.result.marked(), "_____F");
    }

    #[tokio::test]
    async fn concurrent_reads_keep_box_order() {
        struct SlowFirst;

        #[async_trait]
        impl LetterReader for SlowFirst {
            async fn read_letter(
                &self,
                _raster: &BinaryRaster,
                _letter: &LetterBox,
                index: usize,
                _attempt: u32,
                _angle_deg: i32,
            ) -> Symbol {
                let delay = (6 - index as u64) * 5;
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                letter(index)
            }
        }

        let (raster, boxes) = fixture();
        let config = SolverConfig::builder().concurrency(6).build().unwrap();
        let outcome = solve_raster(&SlowFirst, &raster, &boxes, &config).await;
        assert_eq!(outcome.status, SolveStatus::Accepted);
        assert_eq!(outcome.result.text(), "ABCDEF");
    }

    #[tokio::test]
    async fn custom_schedule_is_honoured() {
        let (raster, boxes) = fixture();
        let reader = ScriptedReader::new(|_, _| Symbol::Placeholder);
        let config = SolverConfig::builder()
            .rotation_start_deg(5)
            .rotation_step_deg(3)
            .max_attempts(3)
            .build()
            .unwrap();
        let outcome = solve_raster(&reader, &raster, &boxes, &config).await;

        assert_eq!(outcome.attempts, 3);
        let angles: Vec<i32> = reader
            .calls()
            .into_iter()
            .filter(|(_, index, _)| *index == 1)
            .map(|(_, _, angle)| angle)
            .collect();
        assert_eq!(angles, vec![5, 8, 11]);
    }
}
