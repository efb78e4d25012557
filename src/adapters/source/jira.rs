use super::{DownloadAddress, ProgressField, ProviderProfile, ResultExtractor};
use crate::domain::model::BackupKind;

const BACKUP_PATH: &str = "/rest/backup/1/export/runbackup";
const LAST_TASK_ID_PATH: &str = "/rest/backup/1/export/lastTaskId";
const PROGRESS_PATH: &str = "/rest/backup/1/export/getProgress";
const DOWNLOAD_PATH: &str = "/plugins/servlet/export/download/";

/// Jira Cloud: progress needs the last task id, and the result field wraps a
/// file UUID that becomes the `fileId` download parameter.
pub fn profile() -> ProviderProfile {
    ProviderProfile {
        kind: BackupKind::Jira,
        trigger_path: BACKUP_PATH,
        progress_path: PROGRESS_PATH,
        download_path: DOWNLOAD_PATH,
        last_task_path: Some(LAST_TASK_ID_PATH),
        task_query_param: "taskId",
        progress_field: ProgressField::Numeric("progress"),
        result_field: "result",
        result_extractor: ResultExtractor::Uuid,
        download_address: DownloadAddress::Query("fileId"),
    }
}
