use std::time::Duration;

use crate::config::RecorderConfig;

/// ブラウザが録画できるコンテナ形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingFormat {
    Mp4,
    Webm,
}

impl RecordingFormat {
    /// Safari は MP4、それ以外は WebM
    pub fn from_user_agent(user_agent: &str) -> Self {
        let safari = user_agent.contains("Safari") && !user_agent.contains("Chrome");
        if safari {
            Self::Mp4
        } else {
            Self::Webm
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }

    pub fn mime_type(&self) -> String {
        format!("video/{}", self.extension())
    }
}

/// 録画ボタン1回分の設定
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingPlan {
    pub format: RecordingFormat,
    pub duration: Duration,
    pub file_name: String,
}

impl RecordingPlan {
    pub fn new(config: &RecorderConfig, user_agent: &str) -> Self {
        let format = RecordingFormat::from_user_agent(user_agent);
        Self {
            format,
            duration: Duration::from_secs(config.duration_secs),
            file_name: format!("{}.{}", config.file_stem, format.extension()),
        }
    }
}
