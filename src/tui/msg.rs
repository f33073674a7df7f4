use crossterm::event::{KeyEvent, MouseEvent};

use crate::io::fs_browse::DirEntry;
use crate::model::{
    ChangeEvent, Comment, CommentTarget, Config, DependencyRollup, Project, Task, TaskMatch,
};
use crate::service::ServiceError;

use super::effects::{BoardData, SetKind, StepOutcome};
use super::undo::ActionSet;

/// Everything that can happen to the app: terminal input, or the result of
/// a request coming back from the worker.
#[derive(Debug)]
pub enum Msg {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize {
        width: u16,
        height: u16,
    },

    ProjectsLoaded(Result<Vec<Project>, ServiceError>),
    BoardLoaded {
        project_id: String,
        result: Result<BoardData, ServiceError>,
    },
    SetApplied {
        project_id: String,
        kind: SetKind,
        set: ActionSet,
        result: Result<Vec<StepOutcome>, ServiceError>,
    },
    TaskCreated(Result<Task, ServiceError>),
    ProjectSaved {
        created: bool,
        result: Result<Project, ServiceError>,
    },
    ProjectDeleted {
        id: String,
        result: Result<(), ServiceError>,
    },
    SearchLoaded {
        query: String,
        result: Result<Vec<TaskMatch>, ServiceError>,
    },
    CandidatesLoaded {
        owner_id: String,
        result: Result<Vec<TaskMatch>, ServiceError>,
    },
    CommentsLoaded {
        target: CommentTarget,
        result: Result<Vec<Comment>, ServiceError>,
    },
    CommentPosted(Result<Comment, ServiceError>),
    ActivityLoaded {
        project_id: String,
        result: Result<Vec<ChangeEvent>, ServiceError>,
    },
    RollupLoaded {
        project_id: String,
        result: Result<DependencyRollup, ServiceError>,
    },
    DirListed {
        dir: String,
        result: Result<Vec<DirEntry>, String>,
    },
    ConfigSaved(Result<Config, String>),
}
