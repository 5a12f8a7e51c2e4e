use iced::widget::{button, column, container, horizontal_space, row, text, text_input, Column};
use iced::{event, time, window, Alignment, Element, Event, Length, Size, Subscription, Task, Theme};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, trace, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod error;
mod service;
mod state;
mod ui;

use config::{RequestMode, Settings, ThemeChoice};
use error::UploadError;
use service::ProcessingClient;
use state::data::{ProcessedResult, ResultSource, SelectedFile, UploadRequest};
use state::session::SessionResult;
use state::{Phase, UploadSession};

/// File extensions offered by the file picker
const PICKER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Main application state
struct UploadPreview {
    /// The upload workflow controller
    session: UploadSession,
    /// Client for the processing service
    client: ProcessingClient,
    mode: RequestMode,
    theme: Theme,
    /// Text typed in the URL-reference form
    url_input: String,
    /// Spinner animation frame
    spinner_frame: usize,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked "Select File"
    BrowseRequested,
    /// File picker closed
    FilePicked(Option<PathBuf>),
    /// A file is hovering the window
    DragEntered,
    /// The hovering file left without dropping
    DragLeft,
    /// A file was dropped on the window
    FileDropped(PathBuf),
    /// Picked or dropped file was read from disk
    FileLoaded(Result<SelectedFile, UploadError>),
    /// Request for the session tagged with the token completed
    UploadFinished(u64, Result<ProcessedResult, UploadError>),
    /// Reset button on the original preview
    Reset,
    UrlChanged(String),
    SubmitUrl,
    /// Spinner animation
    Tick,
}

impl UploadPreview {
    /// Create a new instance of the application
    fn new(settings: Settings, client: ProcessingClient, initial_file: Option<PathBuf>) -> (Self, Task<Message>) {
        let theme = match settings.general.theme {
            ThemeChoice::Dark => Theme::Dark,
            ThemeChoice::Light => Theme::Light,
        };

        info!(
            "🎨 Upload Preview ready, sending to {} ({:?})",
            client.endpoint(),
            settings.service.mode
        );

        let app = UploadPreview {
            session: UploadSession::new(settings.limits.policy())
                .with_file_input(settings.service.mode == RequestMode::Multipart),
            client,
            mode: settings.service.mode,
            theme,
            url_input: String::new(),
            spinner_frame: 0,
        };

        // A file given on the command line behaves like a drop (ignored in URL mode)
        let task = match initial_file {
            Some(path) => Task::done(Message::FileDropped(path)),
            None => Task::none(),
        };

        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        let task = self.handle(message);
        trace!(state = ?self.session.snapshot(), "updated");
        task
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::BrowseRequested => {
                if self.session.is_uploading() || !self.session.accepts_files() {
                    return Task::none();
                }
                Task::perform(pick_file(), Message::FilePicked)
            }
            Message::FilePicked(Some(path)) | Message::FileDropped(path) => {
                if !self.session.begin_read(&path) {
                    return Task::none();
                }

                let read_limit = self.session.policy().max_bytes();
                Task::perform(SelectedFile::open(path, read_limit), Message::FileLoaded)
            }
            Message::FilePicked(None) => Task::none(),
            Message::DragEntered => {
                self.session.set_dragging(true);
                Task::none()
            }
            Message::DragLeft => {
                self.session.set_dragging(false);
                Task::none()
            }
            Message::FileLoaded(Ok(file)) => match self.session.accept_file(file) {
                Some(request) => self.dispatch(request),
                None => Task::none(),
            },
            Message::FileLoaded(Err(err)) => {
                self.session.reject(err);
                Task::none()
            }
            Message::UploadFinished(token, outcome) => {
                self.session.finish_upload(token, outcome);
                Task::none()
            }
            Message::Reset => {
                self.session.reset();
                Task::none()
            }
            Message::UrlChanged(value) => {
                self.url_input = value;
                Task::none()
            }
            Message::SubmitUrl => match self.session.submit_url(&self.url_input) {
                Some(request) => self.dispatch(request),
                None => Task::none(),
            },
            Message::Tick => {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                Task::none()
            }
        }
    }

    /// Turn a session request into the one network task for it
    fn dispatch(&self, request: UploadRequest) -> Task<Message> {
        let UploadRequest { token, payload } = request;
        let client = self.client.clone();

        Task::perform(client.process(payload), move |outcome| {
            Message::UploadFinished(token, outcome)
        })
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let title = match self.mode {
            RequestMode::Multipart => "Image Processing",
            RequestMode::UrlReference => "Exam Grade Scanner",
        };

        let body = match self.mode {
            RequestMode::Multipart => self.upload_view(),
            RequestMode::UrlReference => self.url_view(),
        };

        let content: Column<Message> = column![text(title).size(36), body]
            .spacing(24)
            .padding(32)
            .max_width(1100.0)
            .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    /// Drop target, or original and result side by side
    fn upload_view(&self) -> Element<Message> {
        let on_browse = (!self.session.is_uploading()).then_some(Message::BrowseRequested);

        let Some(original) = self.session.original_preview() else {
            // No file: the drop target, plus the error of a rejected file
            let drop_zone = ui::drop_zone::view(self.session.is_dragging(), on_browse);
            return match self.session.last_error() {
                Some(message) => column![drop_zone, ui::status::error(message, 80.0)]
                    .spacing(16)
                    .into(),
                None => drop_zone,
            };
        };

        let caption = self.session.source_file().map(describe_file);
        let on_reset = Some(Message::Reset);
        let left = ui::preview::view("Original", original, caption, on_reset);

        let height = ui::preview::PANEL_HEIGHT;
        let right = match self.session.phase() {
            Phase::Uploading => ui::status::loading(self.spinner_frame, "Processing image...", height),
            Phase::Failed => ui::status::error(self.session.last_error().unwrap_or_default(), height),
            Phase::Success | Phase::Idle => self.result_view(),
        };

        let mut panels = column![row![left, right].spacing(24)].spacing(16);
        if matches!(self.session.phase(), Phase::Success | Phase::Failed) {
            panels = panels.push(
                button(text("Process another image"))
                    .padding([10, 20])
                    .style(button::secondary)
                    .on_press_maybe(on_browse),
            );
        }

        panels.align_x(Alignment::Center).into()
    }

    /// URL form plus the grade, spinner or error below it
    fn url_view(&self) -> Element<Message> {
        let uploading = self.session.is_uploading();

        let input = text_input("Enter PDF URL (Azure Blob Storage)", &self.url_input)
            .on_input(Message::UrlChanged)
            .on_submit(Message::SubmitUrl)
            .padding(14)
            .size(16);

        let submit = button(text(if uploading { "Processing..." } else { "Get Grade" }))
            .padding([14, 28])
            .style(button::primary)
            .on_press_maybe((!uploading).then_some(Message::SubmitUrl));

        let form = row![input, submit].spacing(8).align_y(Alignment::Center);

        let status: Element<Message> = match self.session.phase() {
            Phase::Uploading => ui::status::loading(self.spinner_frame, "Processing PDF...", 160.0),
            Phase::Failed => ui::status::error(self.session.last_error().unwrap_or_default(), 120.0),
            Phase::Success => self.result_view(),
            Phase::Idle => text("Enter a direct URL to a PDF file").size(14).into(),
        };

        column![form, status]
            .spacing(24)
            .max_width(720.0)
            .align_x(Alignment::Center)
            .into()
    }

    /// Processed image panel, or the grade
    fn result_view(&self) -> Element<Message> {
        match self.session.result() {
            Some(SessionResult {
                result,
                preview: Some(handle),
            }) => ui::preview::view("Processed", handle, Some(describe_result(result)), None),
            Some(SessionResult {
                result: ProcessedResult::Grade(grade),
                ..
            }) => ui::preview::grade(grade),
            _ => horizontal_space().into(),
        }
    }

    /// Window drag-and-drop events when files are accepted, plus the spinner clock while uploading
    fn subscription(&self) -> Subscription<Message> {
        let drops = if self.session.accepts_files() {
            event::listen_with(|event, _status, _window| match event {
                Event::Window(window::Event::FileHovered(_)) => Some(Message::DragEntered),
                Event::Window(window::Event::FilesHoveredLeft) => Some(Message::DragLeft),
                Event::Window(window::Event::FileDropped(path)) => Some(Message::FileDropped(path)),
                _ => None,
            })
        } else {
            Subscription::none()
        };

        if self.session.is_uploading() {
            Subscription::batch([drops, time::every(Duration::from_millis(120)).map(|_| Message::Tick)])
        } else {
            drops
        }
    }

    /// Window title follows the session
    fn title(&self) -> String {
        let snapshot = self.session.snapshot();
        if snapshot.dragging {
            return "Upload Preview - drop to process".to_string();
        }

        let Some(name) = snapshot.file_name else {
            return "Upload Preview".to_string();
        };
        let status = match snapshot.phase {
            Phase::Uploading => " (processing)",
            Phase::Failed => " (failed)",
            _ if snapshot.has_result => " (processed)",
            _ => "",
        };
        format!("Upload Preview - {}{}", name, status)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        self.theme.clone()
    }
}

/// "scan.png · image/png · 1.2 MB · 1920×1080"
fn describe_file(file: &SelectedFile) -> String {
    let mut parts = vec![
        file.name.clone(),
        file.media_type.clone(),
        error::format_size(file.size),
    ];
    if let Some((width, height)) = file.dimensions() {
        parts.push(format!("{}×{}", width, height));
    }
    parts.join(" · ")
}

/// Where the processed image came from, its size and dimensions
fn describe_result(result: &ProcessedResult) -> String {
    match result {
        ProcessedResult::Image { bytes, source } => {
            let origin = match source {
                ResultSource::Embedded => "returned inline".to_string(),
                ResultSource::Remote(url) => url.to_string(),
            };
            let mut parts = vec![origin, error::format_size(bytes.len() as u64)];
            if let Some((width, height)) = state::data::image_dimensions(bytes) {
                parts.push(format!("{}×{}", width, height));
            }
            parts.join(" · ")
        }
        ProcessedResult::Grade(grade) => format!("Grade {}", grade),
    }
}

/// Show the native file picker
async fn pick_file() -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title("Select an image to process")
        .add_filter("Images", PICKER_EXTENSIONS)
        .pick_file()
        .await
        .map(|handle| handle.path().to_path_buf())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("upload_preview=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> iced::Result {
    init_logging();

    let flags = match cli::Flags::from_env() {
        Ok(flags) => flags,
        Err(err) => {
            eprintln!("{}\n\n{}", err, cli::HELP);
            std::process::exit(2);
        }
    };
    if flags.help {
        print!("{}", cli::HELP);
        return Ok(());
    }
    if !flags.unused.is_empty() {
        warn!("Ignoring extra arguments: {:?}", flags.unused);
    }

    let (mut settings, warning) = config::load(flags.config.as_deref());
    if let Some(warning) = warning {
        warn!("⚠️  {} (using defaults)", warning);
    }
    flags.apply(&mut settings);

    // Without a usable endpoint there is nothing to talk to
    let client = match ProcessingClient::new(&settings.service) {
        Ok(client) => client,
        Err(err) => {
            error!("{}", err);
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };

    let initial_file = flags.file;

    iced::application(UploadPreview::title, UploadPreview::update, UploadPreview::view)
        .subscription(UploadPreview::subscription)
        .theme(UploadPreview::theme)
        .window_size(Size::new(1200.0, 800.0))
        .centered()
        .run_with(move || UploadPreview::new(settings, client, initial_file))
}
