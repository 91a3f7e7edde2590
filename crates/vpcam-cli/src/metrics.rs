// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use serde::Serialize;
use std::time::{Duration, Instant};

/// Capture statistics of one output
#[derive(Debug, Clone, Serialize)]
pub struct FrameMetrics {
    /// Frame source the statistics belong to (`vse0`, `vse1`, ...)
    pub source: String,
    /// Output size
    pub width: u32,
    pub height: u32,
    /// Total number of frames received
    pub frames_received: u64,
    /// Frames the hardware produced but this output never saw
    pub lost_frames: u64,
    /// Waits that ended without a frame
    pub timeouts: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Average throughput in frames per second
    pub throughput_fps: f64,
    /// Minimum wait for a frame in microseconds
    pub wait_min_us: u64,
    /// Maximum wait for a frame in microseconds
    pub wait_max_us: u64,
    /// Average wait for a frame in microseconds
    pub wait_avg_us: u64,
    /// 95th percentile wait in microseconds
    pub wait_p95_us: u64,
}

/// Collects per-output frame statistics during a capture
pub struct MetricsCollector {
    source: String,
    width: u32,
    height: u32,
    start_time: Instant,
    waits_us: Vec<u64>,
    bytes: u64,
    lost_frames: u64,
    timeouts: u64,
}

impl MetricsCollector {
    pub fn new(source: String, width: u32, height: u32) -> Self {
        Self {
            source,
            width,
            height,
            start_time: Instant::now(),
            waits_us: Vec::new(),
            bytes: 0,
            lost_frames: 0,
            timeouts: 0,
        }
    }

    /// Record one received frame
    pub fn record_frame(&mut self, wait: Duration, bytes: u64, lost: u32) {
        self.waits_us.push(wait.as_micros() as u64);
        self.bytes += bytes;
        self.lost_frames += u64::from(lost);
    }

    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    pub fn frames(&self) -> u64 {
        self.waits_us.len() as u64
    }

    /// Finalize and calculate all metrics
    pub fn finalize(&mut self) -> FrameMetrics {
        let duration = self.start_time.elapsed();
        let duration_secs = duration.as_secs_f64();
        let frames_received = self.frames();

        let throughput_fps = if duration_secs > 0.0 {
            frames_received as f64 / duration_secs
        } else {
            0.0
        };

        self.waits_us.sort_unstable();
        let (min, max, avg) = match (self.waits_us.first(), self.waits_us.last()) {
            (Some(min), Some(max)) => {
                let sum: u64 = self.waits_us.iter().sum();
                (*min, *max, sum / frames_received)
            }
            _ => (0, 0, 0),
        };

        FrameMetrics {
            source: self.source.clone(),
            width: self.width,
            height: self.height,
            frames_received,
            lost_frames: self.lost_frames,
            timeouts: self.timeouts,
            bytes_received: self.bytes,
            duration_ms: duration.as_millis() as u64,
            throughput_fps,
            wait_min_us: min,
            wait_max_us: max,
            wait_avg_us: avg,
            wait_p95_us: self.percentile(95.0),
        }
    }

    /// Percentile of the wait times; assumes they are sorted
    fn percentile(&self, p: f64) -> u64 {
        if self.waits_us.is_empty() {
            return 0;
        }

        let len = self.waits_us.len();
        let idx = ((p / 100.0) * (len - 1) as f64).round() as usize;
        self.waits_us[idx.min(len - 1)]
    }
}

impl FrameMetrics {
    /// Print metrics in human-readable format
    pub fn print_text(&self) {
        println!(
            "\n=== {} ({}x{}) ===",
            self.source, self.width, self.height
        );
        println!("Frames received:   {}", self.frames_received);
        println!(
            "Bytes received:    {} ({:.2} MB)",
            self.bytes_received,
            self.bytes_received as f64 / 1_048_576.0
        );
        println!(
            "Duration:          {:.2} s",
            self.duration_ms as f64 / 1000.0
        );
        println!("Throughput:        {:.2} fps", self.throughput_fps);

        if self.frames_received > 0 {
            println!("\nFrame wait (µs):");
            println!("  Min:    {}", self.wait_min_us);
            println!("  Max:    {}", self.wait_max_us);
            println!("  Avg:    {}", self.wait_avg_us);
            println!("  P95:    {}", self.wait_p95_us);
        }

        if self.lost_frames > 0 {
            let total = self.lost_frames + self.frames_received;
            println!(
                "\nLost frames:       {} ({:.2}%)",
                self.lost_frames,
                (self.lost_frames as f64 / total as f64) * 100.0
            );
        }
        if self.timeouts > 0 {
            println!("Timeouts:          {}", self.timeouts);
        }
    }
}
