use crate::app_error;
use crate::error::Result;
use image::RgbaImage;
use std::fmt;
use tracing::info;
use xcap::Monitor;

/// Кадр - RGBA-снимок наблюдаемой области
pub type Frame = RgbaImage;

/// Прямоугольник экрана в глобальных координатах
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    fn fits_inside(&self, bounds: &MonitorBounds) -> bool {
        let right = self.x as i64 + self.width as i64;
        let bottom = self.y as i64 + self.height as i64;
        self.x >= bounds.x
            && self.y >= bounds.y
            && right <= bounds.x as i64 + bounds.width as i64
            && bottom <= bounds.y as i64 + bounds.height as i64
    }
}

impl fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Источник кадров. Позиция передаётся при каждом вызове и может
/// отличаться от предыдущей.
///
/// Не требует `Send`: платформенные хэндлы захвата создаются прямо
/// в потоке детекции.
pub trait FrameSource {
    fn capture(&mut self, region: CaptureRegion) -> Result<Frame>;
}

#[derive(Debug, Clone, Copy)]
struct MonitorBounds {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

/// Захват экрана через xcap.
///
/// Монитор под областью запоминается и ищется заново только когда
/// область уезжает за его границы.
#[derive(Default)]
pub struct ScreenFrameSource {
    monitor: Option<(Monitor, MonitorBounds)>,
}

impl ScreenFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn locate_monitor(region: CaptureRegion) -> Result<(Monitor, MonitorBounds)> {
        let monitor = Monitor::from_point(region.x, region.y).map_err(|e| {
            app_error!(capture, "нет монитора в точке ({}, {}): {}", region.x, region.y, e)
        })?;

        let bounds = MonitorBounds {
            x: monitor.x().map_err(|e| app_error!(capture, "{}", e))?,
            y: monitor.y().map_err(|e| app_error!(capture, "{}", e))?,
            width: monitor.width().map_err(|e| app_error!(capture, "{}", e))?,
            height: monitor.height().map_err(|e| app_error!(capture, "{}", e))?,
        };

        info!(
            "Область {} на мониторе {}x{}+{}+{}",
            region, bounds.width, bounds.height, bounds.x, bounds.y
        );
        Ok((monitor, bounds))
    }
}

impl FrameSource for ScreenFrameSource {
    fn capture(&mut self, region: CaptureRegion) -> Result<Frame> {
        let cached = matches!(&self.monitor, Some((_, bounds)) if region.fits_inside(bounds));
        if !cached {
            self.monitor = None;
            let located = Self::locate_monitor(region)?;
            if !region.fits_inside(&located.1) {
                return Err(app_error!(capture, "область {} выходит за пределы монитора", region));
            }
            self.monitor = Some(located);
        }

        let Some((monitor, bounds)) = &self.monitor else {
            return Err(app_error!(internal, "монитор не выбран"));
        };

        let local_x = (region.x - bounds.x) as u32;
        let local_y = (region.y - bounds.y) as u32;

        monitor
            .capture_region(local_x, local_y, region.width, region.height)
            .map_err(|e| app_error!(capture, "не удалось снять область {}: {}", region, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_region_display() {
        let region = CaptureRegion::new(100, 200, 32, 32);
        assert_eq!(region.to_string(), "32x32+100+200");
    }

    #[test]
    fn test_region_fits_inside_monitor() {
        let bounds = MonitorBounds { x: 0, y: 0, width: 1920, height: 1080 };

        assert!(CaptureRegion::new(0, 0, 32, 32).fits_inside(&bounds));
        assert!(CaptureRegion::new(1888, 1048, 32, 32).fits_inside(&bounds));
        assert!(!CaptureRegion::new(1889, 0, 32, 32).fits_inside(&bounds));
        assert!(!CaptureRegion::new(-1, 10, 32, 32).fits_inside(&bounds));
    }

    #[test]
    fn test_region_on_secondary_monitor() {
        let bounds = MonitorBounds { x: 1920, y: -200, width: 1280, height: 1024 };

        assert!(CaptureRegion::new(1920, -200, 32, 32).fits_inside(&bounds));
        assert!(!CaptureRegion::new(100, 100, 32, 32).fits_inside(&bounds));
    }
}
