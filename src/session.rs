use crate::assistant::InvoiceParser;
use crate::customer_db::{Customer, CustomerDirectory, NewCustomer, StoreError};
use crate::export::{self, Rasterizer, ShareSheet};
use crate::format::Grouping;
use crate::invoice::{BusinessField, HeaderField, Invoice};
use crate::ledger::{ItemField, NumericField};
use crate::render::{DocumentView, Theme};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{Instrument, error, info, info_span, warn};

/// A message for the user; every failure path ends in one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Notice {
    #[error("AI failed to process the request. Try being more specific!")]
    AssistantFailed,

    #[error("please wait, the previous action is still running")]
    Busy,

    #[error("speech input is not supported here")]
    SpeechUnsupported,

    #[error("speech capture failed: {0}")]
    SpeechFailed(String),

    #[error("sharing is not supported here, use export instead")]
    ShareUnsupported,

    #[error("image export is not available: no rasterizer configured")]
    RasterUnsupported,

    #[error("export failed: {0}")]
    ExportFailed(String),

    #[error("customer name is required")]
    CustomerNameRequired,

    #[error("no customer with id '{0}'")]
    UnknownCustomer(String),

    #[error("could not save customers: {0}")]
    Storage(String),

    #[error("{0}")]
    InvalidField(String),
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SpeechError(pub String);

/// Platform dictation.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    async fn listen(&self) -> Result<String, SpeechError>;
}

/// Snapshot of the busy flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    pub processing: bool,
    pub exporting: bool,
    pub listening: bool,
}

/// A flag held for the length of one action.
///
/// The returned guard clears it on drop, so a failed or cancelled action
/// never leaves it set. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<Mutex<()>>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.try_lock().is_err()
    }

    pub fn try_begin(&self) -> Result<OwnedMutexGuard<()>, Notice> {
        Arc::clone(&self.0).try_lock_owned().map_err(|_| Notice::Busy)
    }
}

/// The live flags, shareable with whatever shows progress to the user.
#[derive(Debug, Clone, Default)]
pub struct ActivityFlags {
    pub processing: BusyFlag,
    pub exporting: BusyFlag,
    pub listening: BusyFlag,
}

/// Owns the invoice being edited and every collaborator it talks to.
pub struct Session {
    invoice: Invoice,
    customers: CustomerDirectory,
    parser: Box<dyn InvoiceParser>,
    rasterizer: Option<Box<dyn Rasterizer>>,
    share_sheet: Option<Box<dyn ShareSheet>>,
    speech: Option<Box<dyn SpeechCapture>>,
    assistant_input: String,
    theme: Theme,
    grouping: Grouping,
    out_dir: PathBuf,
    flags: ActivityFlags,
}

impl Session {
    pub fn new(
        invoice: Invoice,
        customers: CustomerDirectory,
        parser: Box<dyn InvoiceParser>,
    ) -> Self {
        Self {
            invoice,
            customers,
            parser,
            rasterizer: None,
            share_sheet: None,
            speech: None,
            assistant_input: String::new(),
            theme: Theme::default(),
            grouping: Grouping::default(),
            out_dir: PathBuf::from("."),
            flags: ActivityFlags::default(),
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: Box<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_share_sheet(mut self, sheet: Box<dyn ShareSheet>) -> Self {
        self.share_sheet = Some(sheet);
        self
    }

    pub fn with_speech(mut self, speech: Box<dyn SpeechCapture>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_output(mut self, grouping: Grouping, out_dir: impl Into<PathBuf>) -> Self {
        self.grouping = grouping;
        self.out_dir = out_dir.into();
        self
    }

    pub fn invoice(&self) -> &Invoice {
        &self.invoice
    }

    pub fn customers(&self) -> &[Customer] {
        self.customers.all()
    }

    pub fn activity(&self) -> Activity {
        Activity {
            processing: self.flags.processing.is_set(),
            exporting: self.flags.exporting.is_set(),
            listening: self.flags.listening.is_set(),
        }
    }

    pub fn activity_flags(&self) -> ActivityFlags {
        self.flags.clone()
    }

    pub fn assistant_input(&self) -> &str {
        &self.assistant_input
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn view(&self) -> DocumentView {
        DocumentView::build(&self.invoice, self.grouping)
    }

    // Ledger edits.

    pub fn add_item(&mut self) -> String {
        self.invoice.ledger_mut().add_item()
    }

    pub fn remove_item(&mut self, id: &str) -> bool {
        self.invoice.ledger_mut().remove_item(id)
    }

    pub fn set_item_field(&mut self, id: &str, field: ItemField, value: &str) -> bool {
        self.invoice.ledger_mut().set_item_field(id, field, value)
    }

    pub fn finish_item_edit(&mut self, id: &str, field: NumericField) -> bool {
        self.invoice.ledger_mut().finish_edit(id, field)
    }

    // Header edits.

    pub fn set_header(&mut self, field: HeaderField, value: &str) -> Result<(), Notice> {
        self.invoice
            .set_header(field, value)
            .map_err(|e| Notice::InvalidField(e.to_string()))
    }

    pub fn set_business(&mut self, field: BusinessField, value: &str) {
        self.invoice.set_business(field, value);
    }

    // Assistant.

    pub fn set_assistant_input(&mut self, text: &str) {
        self.assistant_input = text.to_string();
    }

    /// Send the assistant input to the parser and apply what comes back.
    ///
    /// Blank input does nothing. On failure the invoice and the input are
    /// left exactly as they were.
    pub async fn submit_assistant(&mut self) -> Result<(), Notice> {
        let text = self.assistant_input.trim().to_string();
        if text.is_empty() {
            return Ok(());
        }
        let _busy = self.flags.processing.try_begin()?;
        let span = info_span!("assistant", parser = self.parser.name());
        let result = self.parser.parse(&text).instrument(span).await;

        match result {
            Ok(parsed) => {
                info!(
                    customer = ?parsed.customer_name,
                    items = parsed.items.len(),
                    "Applying assistant result"
                );
                self.invoice.apply_parsed(&parsed, &self.customers);
                self.assistant_input.clear();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Assistant parse failed");
                Err(Notice::AssistantFailed)
            }
        }
    }

    /// Capture a spoken request into the assistant input.
    pub async fn dictate(&mut self) -> Result<(), Notice> {
        let Some(speech) = self.speech.as_ref() else {
            return Err(Notice::SpeechUnsupported);
        };
        let busy = self.flags.listening.try_begin()?;
        let result = speech.listen().await;
        drop(busy);

        match result {
            Ok(transcript) => {
                info!(chars = transcript.len(), "Transcript captured");
                self.assistant_input = transcript;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Speech capture failed");
                Err(Notice::SpeechFailed(e.0))
            }
        }
    }

    // Customer directory.

    pub fn add_customer(&mut self, new: NewCustomer) -> Result<Customer, Notice> {
        match self.customers.add(new) {
            Ok(customer) => Ok(customer.clone()),
            Err(StoreError::MissingName) => Err(Notice::CustomerNameRequired),
            Err(e) => {
                error!(error = %e, "Customer save failed");
                Err(Notice::Storage(e.to_string()))
            }
        }
    }

    pub fn select_customer(&mut self, id: &str) -> Result<(), Notice> {
        let customer = self
            .customers
            .get(id)
            .ok_or_else(|| Notice::UnknownCustomer(id.to_string()))?;
        self.invoice.apply_customer(customer);
        Ok(())
    }

    // Export.

    pub async fn export_png(&mut self) -> Result<PathBuf, Notice> {
        if self.rasterizer.is_none() {
            return Err(Notice::RasterUnsupported);
        }
        let _busy = self.flags.exporting.try_begin()?;
        let view = self.view();
        match self.rasterizer.as_deref() {
            Some(r) => export::export_png(r, &view, self.theme, &self.out_dir)
                .instrument(info_span!("export", format = "png"))
                .await
                .map_err(export_notice),
            None => Err(Notice::RasterUnsupported),
        }
    }

    pub async fn export_pdf(&mut self) -> Result<PathBuf, Notice> {
        let _busy = self.flags.exporting.try_begin()?;
        let view = self.view();
        export::export_pdf(self.rasterizer.as_deref(), &view, self.theme, &self.out_dir)
            .instrument(info_span!("export", format = "pdf"))
            .await
            .map_err(export_notice)
    }

    pub async fn share(&mut self) -> Result<(), Notice> {
        if self.share_sheet.is_none() {
            return Err(Notice::ShareUnsupported);
        }
        if self.rasterizer.is_none() {
            return Err(Notice::RasterUnsupported);
        }
        let _busy = self.flags.exporting.try_begin()?;
        self.share_inner().instrument(info_span!("share")).await
    }

    async fn share_inner(&self) -> Result<(), Notice> {
        let (Some(rasterizer), Some(sheet)) =
            (self.rasterizer.as_deref(), self.share_sheet.as_deref())
        else {
            return Err(Notice::ShareUnsupported);
        };
        let view = self.view();
        let payload = export::share_payload(
            rasterizer,
            &view,
            self.theme,
            &self.invoice.business_info.name,
        )
        .await
        .map_err(export_notice)?;

        if !sheet.can_share(&payload) {
            return Err(Notice::ShareUnsupported);
        }
        sheet.share(payload).await.map_err(export_notice)?;
        info!(invoice = %view.invoice_number, "Invoice shared");
        Ok(())
    }

}

fn export_notice(e: export::ExportError) -> Notice {
    error!(error = %e, "Export failed");
    Notice::ExportFailed(e.to_string())
}
