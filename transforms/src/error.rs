use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"), context(false))]
    Ir { source: kiln_ir::Error },

    #[snafu(display("unknown pass '{name}'; registered passes: {available}"))]
    UnknownPass { name: String, available: String },

    #[snafu(display("empty pass name in pipeline '{pipeline}'"))]
    EmptyPassName { pipeline: String },

    #[snafu(display("pass '{pass}' failed on @{func}: {source}"))]
    PassFailed { pass: &'static str, func: String, source: kiln_ir::Error },
}
