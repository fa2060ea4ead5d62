use crate::app_error;
use crate::debug_if_enabled;
use crate::error::{AppError, Result};
use image::{imageops, GrayImage};
use tracing::warn;

use super::capture::Frame;

const VARIANCE_EPSILON: f64 = 1e-9;

/// Шаблон иконки способности с привязанной клавишей.
///
/// Центрированные значения и их норма считаются один раз при загрузке:
/// шаблоны неизменны всю сессию.
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    name: String,
    bound_key: String,
    image: GrayImage,
    centered: Vec<f64>,
    energy: f64,
}

impl TemplateEntry {
    pub fn new(name: impl Into<String>, bound_key: impl Into<String>, image: GrayImage) -> Result<Self> {
        let name = name.into();
        let bound_key = bound_key.into().trim().to_string();
        if bound_key.is_empty() {
            return Err(app_error!(invalid_key, "у шаблона '{}' нет клавиши", name));
        }

        let pixels = image.as_raw();
        let mean = if pixels.is_empty() {
            0.0
        } else {
            pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len() as f64
        };
        let centered: Vec<f64> = pixels.iter().map(|&p| p as f64 - mean).collect();
        let energy = centered.iter().map(|v| v * v).sum();

        Ok(Self {
            name,
            bound_key,
            image,
            centered,
            energy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bound_key(&self) -> &str {
        &self.bound_key
    }

    /// Коэффициент корреляции (TM_CCOEFF_NORMED) при лучшем смещении шаблона
    /// внутри кадра, ограниченный интервалом [0, 1].
    pub fn score(&self, frame: &GrayImage) -> Result<f64> {
        let (tw, th) = self.image.dimensions();
        let (fw, fh) = frame.dimensions();

        if tw == 0 || th == 0 {
            return Err(self.match_error("пустое изображение шаблона".to_string()));
        }
        if tw > fw || th > fh {
            return Err(self.match_error(format!("шаблон {}x{} больше кадра {}x{}", tw, th, fw, fh)));
        }

        let frame_pixels = frame.as_raw();
        let (tw, th, fw) = (tw as usize, th as usize, fw as usize);
        let n = (tw * th) as f64;
        let mut best = 0.0f64;

        for oy in 0..=(fh as usize - th) {
            for ox in 0..=(fw - tw) {
                let mut sum = 0.0;
                let mut sum_sq = 0.0;
                let mut cross = 0.0;

                for ty in 0..th {
                    let row = (oy + ty) * fw + ox;
                    let window = &frame_pixels[row..row + tw];
                    let template_row = &self.centered[ty * tw..(ty + 1) * tw];
                    for (&p, &t) in window.iter().zip(template_row) {
                        let v = p as f64;
                        sum += v;
                        sum_sq += v * v;
                        cross += v * t;
                    }
                }

                // Σ(T - T̄) = 0, поэтому Σ(T - T̄)(I - Ī) = Σ(T - T̄)·I
                let window_energy = (sum_sq - sum * sum / n).max(0.0);
                let denominator = (window_energy * self.energy).sqrt();
                if denominator > VARIANCE_EPSILON {
                    best = best.max(cross / denominator);
                }
            }
        }

        Ok(best.clamp(0.0, 1.0))
    }

    fn match_error(&self, reason: String) -> AppError {
        AppError::Match {
            template: self.name.clone(),
            reason,
        }
    }
}

/// Результат сопоставления одного кадра.
///
/// `score` - лучший увиденный коэффициент, даже если он ниже порога.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    pub best: Option<&'a TemplateEntry>,
    pub score: f64,
}

impl<'a> MatchResult<'a> {
    #[allow(dead_code)]
    pub fn name(&self) -> Option<&'a str> {
        self.best.map(|t| t.name())
    }

    pub fn bound_key(&self) -> Option<&'a str> {
        self.best.map(|t| t.bound_key())
    }

    #[allow(dead_code)]
    pub fn is_match(&self) -> bool {
        self.best.is_some()
    }
}

pub struct TemplateMatcher {
    threshold: f64,
}

impl TemplateMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Найти шаблон с максимальным коэффициентом выше порога.
    ///
    /// Лучший меняется только при строго большем значении: при равенстве
    /// побеждает шаблон, добавленный раньше.
    pub fn match_frame<'a>(&self, frame: &Frame, templates: &'a [TemplateEntry]) -> MatchResult<'a> {
        let gray = imageops::grayscale(frame);

        let mut best: Option<&'a TemplateEntry> = None;
        let mut best_score = 0.0f64;
        let mut highest_seen = 0.0f64;

        for template in templates {
            let score = match template.score(&gray) {
                Ok(score) => score,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };

            highest_seen = highest_seen.max(score);
            if score > self.threshold && score > best_score {
                best = Some(template);
                best_score = score;
            }
        }

        if let Some(template) = best {
            debug_if_enabled!(
                "🔍 Совпадение {}: score = {:.3}, клавиша = {}",
                template.name(),
                best_score,
                template.bound_key()
            );
            MatchResult { best, score: best_score }
        } else {
            MatchResult { best: None, score: highest_seen }
        }
    }
}
