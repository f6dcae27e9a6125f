//! 时间工具

/// 帧号 → 秒 (fps 为 0 时返回 0)
pub fn frame_to_seconds(frame: u64, fps: f64) -> f64 {
    if fps <= 0.0 {
        return 0.0;
    }
    frame as f64 / fps
}

/// 格式化时间戳为 MM:SS
pub fn format_mmss(seconds: f64) -> String {
    let mm = (seconds / 60.0) as u32;
    let ss = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mm, ss)
}

/// 格式化时间戳为 MM:SS.ms
pub fn format_mmss_ms(seconds: f64) -> String {
    let mm = (seconds / 60.0) as u32;
    let ss = (seconds % 60.0) as u32;
    let ms = ((seconds % 1.0) * 1000.0) as u32;
    format!("{:02}:{:02}.{:03}", mm, ss, ms)
}

/// 片段帧区间的时间描述，例如 `00:01.500 - 00:03.000`
pub fn format_frame_range(start_frame: u64, finish_frame: u64, fps: f64) -> String {
    format!(
        "{} - {}",
        format_mmss_ms(frame_to_seconds(start_frame, fps)),
        format_mmss_ms(frame_to_seconds(finish_frame, fps))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mmss() {
        assert_eq!(format_mmss(0.0), "00:00");
        assert_eq!(format_mmss(65.5), "01:05");
        assert_eq!(format_mmss(3661.0), "61:01");
    }

    #[test]
    fn test_frame_range() {
        assert_eq!(frame_to_seconds(45, 30.0), 1.5);
        assert_eq!(frame_to_seconds(45, 0.0), 0.0);
        assert_eq!(format_frame_range(45, 90, 30.0), "00:01.500 - 00:03.000");
    }
}
