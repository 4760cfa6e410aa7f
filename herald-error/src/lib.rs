//! Централизованная обработка ошибок для шины `herald`.
//!
//! - `status_code`: числовые коды статуса и уровни логирования.
//! - `ext`: трейт [`ErrorExt`], общий для всех ошибок библиотеки.
//! - `stack`: [`StackError`] с цепочкой контекстов.
//! - `macros`: `bail!`, `ensure!`, [`ResultExt`].
//! - `types`: конкретные типы ошибок (pub/sub, generic).

pub mod ext;
pub mod macros;
pub mod stack;
pub mod status_code;
pub mod types;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use ext::*;
pub use macros::*;
pub use stack::*;
pub use status_code::*;
pub use types::*;

pub type HeraldResult<T> = Result<T, StackError>;
