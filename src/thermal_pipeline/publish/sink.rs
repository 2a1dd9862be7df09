use tracing::{debug, info};

use crate::thermal_pipeline::camera::{CycleFrames, CycleOutput};
use crate::thermal_pipeline::common::error::Result;
use crate::thermal_pipeline::publish::camera_info::CameraInfo;

/// Receives the outputs of every successful cycle.
pub trait FrameSink {
    fn publish(&mut self, output: &CycleOutput, info: &CameraInfo) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn publish(&mut self, output: &CycleOutput, info: &CameraInfo) -> Result<()> {
        (**self).publish(output, info)
    }
}

/// Logs cycle outputs: every cycle at debug level, a summary at info
/// level every `report_every` cycles.
#[derive(Debug)]
pub struct TracingSink {
    report_every: u64,
    published: u64,
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(60)
    }
}

impl TracingSink {
    pub fn new(report_every: u64) -> Self {
        Self {
            report_every: report_every.max(1),
            published: 0,
        }
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl FrameSink for TracingSink {
    fn publish(&mut self, output: &CycleOutput, info: &CameraInfo) -> Result<()> {
        self.published += 1;

        match &output.frames {
            CycleFrames::Radiometric(frames) => {
                let t = &frames.temperatures;
                debug!(
                    frame_id = %info.frame_id,
                    sequence = output.sequence,
                    max_temp = t.max_temp,
                    min_temp = t.min_temp,
                    ptr_temp = t.ptr_temp,
                    scaled = frames.scaled.is_some(),
                    "Radiometric frame"
                );
                if self.published % self.report_every == 0 {
                    info!(
                        "{}: max {:.2} deg, min {:.2} deg, ptr {:.2} deg ({} frames)",
                        info.camera_name, t.max_temp, t.min_temp, t.ptr_temp, self.published
                    );
                }
            }
            CycleFrames::Zoomed { linear16, .. } => {
                let (width, height) = linear16.dimensions();
                debug!(sequence = output.sequence, width, height, "Zoomed 16-bit frame");
            }
            CycleFrames::Luma { gray8 } => {
                let (width, height) = gray8.dimensions();
                debug!(sequence = output.sequence, width, height, "Luma frame");
            }
        }

        if self.published % self.report_every == 0 && output.temperatures().is_none() {
            info!(
                "{}: {} {} frames published",
                info.camera_name,
                self.published,
                output.kind()
            );
        }
        Ok(())
    }
}
