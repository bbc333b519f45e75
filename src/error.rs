use custom_error::custom_error;

pub type Result<T> = std::result::Result<T, Error>;

custom_error! {pub Error
    Io{source: std::io::Error} = "I/O error",
    Zip{source: zip::result::ZipError} = "zip archive error",
    Format{line: usize, reason: String} = "bad record on line {line}: {reason}",
    Ambiguous{ident: String} = "ambiguous reference to {ident}",
    NotFound{ident: String} = "no such identifier {ident}",
    TransitionNotFound{name: String} = "transition {name} not found",
    Unanchored = "AGL altitude has no ground reference",
    FloatingReference{what: String} = "unresolved {what}",
    NoLocalVariation{ident: String} = "no local magnetic variation found near {ident}",
    NonConvergence = "geodesic solution did not converge",
    Structural{reason: String} = "malformed feed: {reason}"
}

impl Error {
    pub fn structural<S: Into<String>>(reason: S) -> Error {
        Error::Structural {
            reason: reason.into(),
        }
    }

    pub fn floating<S: Into<String>>(what: S) -> Error {
        Error::FloatingReference { what: what.into() }
    }
}
