//! Hardware identity from `/sys/class/dmi/id`

use gpdfan_core::{select_board, BoardDescriptor, BoardKind, DmiIdentity, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Default location of the DMI identity files
pub const DMI_ID_PATH: &str = "/sys/class/dmi/id";

/// Read the identity of this machine
pub fn read_dmi_identity() -> Result<DmiIdentity> {
    read_dmi_identity_from(Path::new(DMI_ID_PATH))
}

/// Read the identity from a directory laid out like `/sys/class/dmi/id`
pub fn read_dmi_identity_from(dir: &Path) -> Result<DmiIdentity> {
    let field = |name: &str| -> Result<String> {
        let value = fs::read_to_string(dir.join(name))?;
        Ok(value.trim().to_string())
    };

    let identity = DmiIdentity {
        sys_vendor: field("sys_vendor")?,
        product_name: field("product_name")?,
        product_version: field("product_version")?,
    };
    debug!("DMI identity: {}", identity);
    Ok(identity)
}

/// Resolve the board: `override_kind` if given, otherwise the DMI table.
///
/// DMI is only read when there is no override.
pub fn detect_board(override_kind: Option<BoardKind>) -> Result<&'static BoardDescriptor> {
    detect_board_from(override_kind, Path::new(DMI_ID_PATH))
}

pub fn detect_board_from(
    override_kind: Option<BoardKind>,
    dir: &Path,
) -> Result<&'static BoardDescriptor> {
    let identity = match override_kind {
        Some(_) => DmiIdentity::default(),
        None => read_dmi_identity_from(dir)?,
    };

    let board = select_board(override_kind, &identity)?;
    info!("Selected board: {}", board.kind);
    Ok(board)
}
