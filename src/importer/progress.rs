// ==========================================
// 宪兵纪律案卷导入系统 - 进度回调
// ==========================================
// 每处理完一行调用一次，载荷 (total, success, error)
// 回调不得修改管道状态，也不应阻塞
// ==========================================

use crate::domain::import::ImportProgress;
use tokio::sync::mpsc::UnboundedSender;

pub trait ProgressSink {
    fn on_progress(&mut self, progress: ImportProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(ImportProgress),
{
    fn on_progress(&mut self, progress: ImportProgress) {
        self(progress)
    }
}

/// 不关心进度的调用方
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _progress: ImportProgress) {}
}

/// 通过 tokio 通道转发进度（接收端关闭后静默丢弃）
pub struct ChannelProgress(pub UnboundedSender<ImportProgress>);

impl ProgressSink for ChannelProgress {
    fn on_progress(&mut self, progress: ImportProgress) {
        let _ = self.0.send(progress);
    }
}
