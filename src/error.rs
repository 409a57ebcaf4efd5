use std::io;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// Constructor given input that can never become a playable gif
        InvalidArgument(reason: &'static str) {
            display("invalid argument: {}", reason)
        }
        /// Frames/delays read or controller requested before decoding finished
        NotReady {
            display("gif has not been prepared yet")
        }
        IndexOutOfRange(index: usize, len: usize) {
            display("frame index {} out of range 0..{}", index, len)
        }
        NoFrames {
            display("gif contains no frames")
        }
        /// Controller requested before a draw sink was installed
        NoSink {
            display("no draw sink installed")
        }
        Fetch(err: Box<ureq::Error>) {
            display("fetch from network failed: {}", err)
            from(err: ureq::Error) -> (Box::new(err))
        }
        Decode(err: gif::DecodingError) {
            display("unable to decode gif: {}", err)
            from()
        }
        Screen(err: gif_dispose::Error) {
            display("unable to composite frame: {}", err)
            from()
        }
        Io(err: io::Error) {
            display("{}", err)
            from()
        }
    }
}

pub type CatResult<T, E = Error> = Result<T, E>;

impl Error {
    /// HTTP status of a failed fetch, if the server replied at all.
    pub fn fetch_status(&self) -> Option<u16> {
        match self {
            Error::Fetch(err) => match **err {
                ureq::Error::Status(code, _) => Some(code),
                _ => None,
            },
            _ => None,
        }
    }
}
