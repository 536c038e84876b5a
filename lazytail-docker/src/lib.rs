mod options;
mod source;

pub use options::logs_options;
pub use source::DockerLogSource;
