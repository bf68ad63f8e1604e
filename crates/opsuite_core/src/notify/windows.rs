use crate::error::AppError;
use crate::model::ActivityLogEntry;
use crate::notify::{Notifier, body, summary};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, entry: &ActivityLogEntry) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(&summary(entry))
            .text1(&body(entry))
            .text2(&entry.timestamp)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
