use bitflags::bitflags;

// Values mirror the `IORING_CQE_F_*` constants from the kernel uapi header,
// which the `io_uring` crate does not expose as a flags type.
const IORING_CQE_F_BUFFER: u32 = 1;
const IORING_CQE_F_MORE: u32 = 2;
const IORING_CQE_F_SOCK_NONEMPTY: u32 = 4;
const IORING_CQE_F_NOTIF: u32 = 8;

bitflags!(
    /// Request specific information carried in the CQE flags field.
    /// See man page for complete description:
    /// https://man7.org/linux/man-pages/man7/io_uring.7.html
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
    pub struct CompletionFlags: u32 {
        /// The upper 16 bits carry the ID of a kernel-selected buffer.
        const BUFFER = IORING_CQE_F_BUFFER;

        /// More completions will follow for the same request.
        const MORE = IORING_CQE_F_MORE;

        /// The socket still had data left after this receive.
        const SOCK_NONEMPTY = IORING_CQE_F_SOCK_NONEMPTY;

        /// Notification completion, as seen with zero-copy send.
        const NOTIF = IORING_CQE_F_NOTIF;
    }
);

impl From<u32> for CompletionFlags {
    fn from(value: u32) -> Self {
        Self::from_bits_retain(value)
    }
}
