//! # Worker Module
//!
//! Background jobs that must not slow the session down: storing the
//! assembled picture and the single shots, counting, logging and
//! queueing prints.
//!
//! Tasks are grouped by trigger:
//! - **Review** - original, thumbnail and watermarked picture each get their own list
//! - **Postprocess** - automatic tasks without an action, print tasks for `print`
//! - **Shot** - single shots forwarded by the camera

mod tasks;

pub use tasks::{Counter, EventLog, Job, LogEntry, PictureSaver, PrintQueue, WorkerTask};

use crate::config::{StorageConfig, WorkerConfig};
use crate::core::machine::State;
use crate::core::picture::{Picture, PictureList, PictureRef};
use crate::core::subscriber::Subscriber;
use crate::error::{DeviceError, Result};
use crate::events::{names, Communicator, Event, Workers};
use tracing::{debug, warn};

const PRINT_ACTION: &str = "print";

type TaskList = Vec<Box<dyn WorkerTask>>;

/// Worker subscriber
pub struct Worker {
    pictures: PictureList,
    review_picture: TaskList,
    review_thumbnail: TaskList,
    review_watermarked: TaskList,
    postprocess_auto: TaskList,
    postprocess_print: TaskList,
    shot: TaskList,
    picture_counter: Counter,
    print_counter: Counter,
    event_log: EventLog,
    print_queue: PrintQueue,
}

impl Worker {
    /// Set up the picture list below `storage` and the task lists
    pub fn new(
        storage: &StorageConfig,
        config: &WorkerConfig,
    ) -> std::result::Result<Self, DeviceError> {
        let pictures = PictureList::new(&storage.full_basename())?;
        Ok(Self::with_pictures(pictures, config))
    }

    /// Same as [`Worker::new`] with an existing picture list
    pub fn with_pictures(pictures: PictureList, config: &WorkerConfig) -> Self {
        let picture_counter = Counter::new("picture");
        let print_counter = Counter::new("print");
        let event_log = EventLog::new("picture");
        let print_queue = PrintQueue::new();

        let mut worker = Self {
            pictures,
            review_picture: Vec::new(),
            review_thumbnail: Vec::new(),
            review_watermarked: Vec::new(),
            postprocess_auto: Vec::new(),
            postprocess_print: Vec::new(),
            shot: Vec::new(),
            picture_counter,
            print_counter,
            event_log,
            print_queue,
        };
        worker.init_review_tasks(config);
        worker.init_postprocess_tasks(config);
        worker.init_shot_tasks(config);
        worker
    }

    fn init_review_tasks(&mut self, config: &WorkerConfig) {
        self.review_picture.push(Box::new(self.picture_counter.clone()));
        self.review_picture
            .push(Box::new(self.event_log.with_kind("picture")));

        if config.save_pictures {
            self.review_picture.push(Box::new(PictureSaver));
            self.review_thumbnail.push(Box::new(PictureSaver));
            self.review_watermarked.push(Box::new(PictureSaver));
        }
    }

    fn init_postprocess_tasks(&mut self, config: &WorkerConfig) {
        let tasks = if config.print_automatically {
            &mut self.postprocess_auto
        } else {
            &mut self.postprocess_print
        };
        tasks.push(Box::new(self.print_queue.clone()));
        tasks.push(Box::new(self.print_counter.clone()));
        tasks.push(Box::new(self.event_log.with_kind("print")));
    }

    fn init_shot_tasks(&mut self, config: &WorkerConfig) {
        if config.save_pictures {
            self.shot.push(Box::new(PictureSaver));
        }
        self.shot.push(Box::new(self.event_log.with_kind("shot")));
    }

    /// Number of assembled pictures handled since startup
    pub fn picture_counter(&self) -> Counter {
        self.picture_counter.clone()
    }

    /// Number of print requests handled since startup
    pub fn print_counter(&self) -> Counter {
        self.print_counter.clone()
    }

    pub fn event_log(&self) -> EventLog {
        self.event_log.clone()
    }

    pub fn print_queue(&self) -> PrintQueue {
        self.print_queue.clone()
    }

    fn review(&mut self, picture: &Picture) -> Result<()> {
        let target = self.pictures.next_picture();
        run_tasks(
            &mut self.review_picture,
            &Job::Store {
                data: &picture.original[..],
                filename: &target.original,
            },
        )?;
        run_tasks(
            &mut self.review_thumbnail,
            &Job::Store {
                data: &picture.thumbnail[..],
                filename: &target.thumbnail,
            },
        )?;
        run_tasks(
            &mut self.review_watermarked,
            &Job::Store {
                data: &picture.watermarked[..],
                filename: &target.watermarked,
            },
        )?;
        Ok(())
    }

    fn postprocess(
        &mut self,
        picture_ref: Option<&PictureRef>,
        action: Option<&str>,
    ) -> Result<()> {
        let tasks = match action {
            None => &mut self.postprocess_auto,
            Some(PRINT_ACTION) => &mut self.postprocess_print,
            Some(other) => {
                debug!(action = other, "No worker tasks for postprocess action");
                return Ok(());
            }
        };
        if tasks.is_empty() {
            return Ok(());
        }

        // Right after a review the state does not name the picture
        let Some(picture_ref) = picture_ref.cloned().or_else(|| self.pictures.last()) else {
            warn!("Postprocess requested before any picture was taken");
            return Ok(());
        };
        run_tasks(
            tasks,
            &Job::Postprocess {
                picture_ref: &picture_ref,
            },
        )
    }
}

fn run_tasks(tasks: &mut TaskList, job: &Job<'_>) -> Result<()> {
    for task in tasks.iter_mut() {
        task.run(job).map_err(|err| match err {
            DeviceError::Task { .. } | DeviceError::Io { .. } => err,
            other => DeviceError::Task {
                task: task.name().to_string(),
                reason: other.to_string(),
            },
        })?;
    }
    Ok(())
}

impl Subscriber for Worker {
    fn role(&self) -> Workers {
        Workers::Worker
    }

    fn origin(&self) -> &'static str {
        "Worker"
    }

    fn handle_state(&mut self, state: &State, _comm: &Communicator) -> Result<()> {
        match state {
            State::Review { picture } => self.review(picture),
            State::Postprocess {
                picture_ref,
                action,
            } => self.postprocess(picture_ref.as_ref(), action.as_deref()),
            State::GallerySelect {
                picture_ref,
                action,
            } => self.postprocess(Some(picture_ref), action.as_deref()),
            _ => Ok(()),
        }
    }

    fn handle_event(&mut self, event: &Event, _comm: &Communicator) -> Result<()> {
        match event {
            Event::Camera(camera) if camera.name() == names::CAPTURE => {
                let Some(shot) = camera.shot() else {
                    return Ok(());
                };
                let filename = self.pictures.next_shot();
                run_tasks(
                    &mut self.shot,
                    &Job::Store {
                        data: &shot.data[..],
                        filename: &filename,
                    },
                )
            }
            other => Err(DeviceError::Task {
                task: "dispatch".to_string(),
                reason: format!("unexpected event {}", other),
            }
            .into()),
        }
    }
}
