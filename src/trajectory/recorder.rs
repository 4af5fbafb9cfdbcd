//! CSV output for simulated trajectories and curve fits.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::TRAJECTORY_HEADER;
use crate::compute::{PersistenceError, Trajectory};

/// Streams trajectories as CSV rows, numbering them in recording order.
pub struct TrajectoryRecorder<W: Write> {
    writer: W,
    recorded: usize,
}

impl<W: Write> TrajectoryRecorder<W> {
    /// Write the header and start recording.
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{}", TRAJECTORY_HEADER)?;
        Ok(Self {
            writer,
            recorded: 0,
        })
    }

    /// Append every sample of one trajectory.
    pub fn record(&mut self, trajectory: &Trajectory) -> io::Result<()> {
        let id = self.recorded;
        for (time, state) in &trajectory.samples {
            writeln!(
                self.writer,
                "{},{},{},{},{}",
                id, time, state.x, state.y, state.yaw
            )?;
        }
        self.recorded += 1;
        Ok(())
    }

    /// Number of trajectories recorded so far.
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Flush and return the writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Write trajectories to a CSV file.
pub fn save_trajectories<P: AsRef<Path>>(
    path: P,
    trajectories: &[Trajectory],
) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    let mut recorder = TrajectoryRecorder::new(BufWriter::new(File::create(path)?))?;
    for trajectory in trajectories {
        recorder.record(trajectory)?;
    }
    recorder.finish()?;
    log::info!("Saved {} trajectories to {}", trajectories.len(), path.display());
    Ok(())
}

/// Write `x,target,output,error` rows for a curve fit.
pub fn save_curve_fit<P: AsRef<Path>>(
    path: P,
    points: &[f32],
    targets: &[f32],
    outputs: &[f32],
) -> Result<(), PersistenceError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writeln!(writer, "x,target,output,error")?;
    for ((x, target), output) in points.iter().zip(targets).zip(outputs) {
        writeln!(writer, "{},{},{},{}", x, target, output, output - target)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::State;
    use crate::trajectory::load_initial_states;

    fn trajectory(start: State) -> Trajectory {
        Trajectory {
            samples: vec![(0.0, start), (0.5, State::new(0.0, 0.0, 0.0))],
            reached: true,
        }
    }

    #[test]
    fn test_recorder_rows() {
        let mut recorder = TrajectoryRecorder::new(Vec::new()).unwrap();
        recorder.record(&trajectory(State::new(1.0, 2.0, 0.5))).unwrap();
        recorder.record(&trajectory(State::new(-1.0, 0.0, 0.0))).unwrap();
        assert_eq!(recorder.recorded(), 2);

        let text = String::from_utf8(recorder.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], TRAJECTORY_HEADER);
        assert_eq!(lines[1], "0,0,1,2,0.5");
        assert_eq!(lines[2], "0,0.5,0,0,0");
        assert_eq!(lines[3], "1,0,-1,0,0");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_saved_trajectories_reload_as_initial_states() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trajectories.csv");
        let starts = [State::new(5.5, -5.5, 1.31), State::new(-2.0, 3.0, 0.0)];
        let trajectories: Vec<Trajectory> = starts.iter().map(|&s| trajectory(s)).collect();

        save_trajectories(&path, &trajectories).unwrap();
        assert_eq!(load_initial_states(&path).unwrap(), starts.to_vec());
    }

    #[test]
    fn test_curve_fit_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.csv");
        save_curve_fit(&path, &[0.0, 0.5], &[1.0, 2.0], &[1.5, 2.0]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "x,target,output,error\n0,1,1.5,0.5\n0.5,2,2,0\n");
    }
}
