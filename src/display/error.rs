/*
 *  display/error.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Unified error types for the display subsystem
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::error::Error;
use std::fmt;
use std::io;

/// Unified error type for all display sink operations
#[derive(Debug)]
pub enum DisplayError {
    /// A band was offered with a byte count that does not match its row span
    BandSizeMismatch { expected: usize, actual: usize },

    /// A band was aimed past the bottom edge of the panel
    RowOutOfRange { dest_row: u32, rows: u32, height: u32 },

    /// Writing the presented frame out failed
    Io(io::Error),

    /// Drawing operation failed
    DrawingError(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::BandSizeMismatch { expected, actual } =>
                write!(f, "band size mismatch: expected {} bytes, got {}", expected, actual),
            DisplayError::RowOutOfRange { dest_row, rows, height } =>
                write!(f, "band rows {}..{} exceed panel height {}", dest_row, dest_row + rows, height),
            DisplayError::Io(err) =>
                write!(f, "frame output error: {}", err),
            DisplayError::DrawingError(msg) =>
                write!(f, "drawing error: {}", msg),
        }
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DisplayError {
    fn from(err: io::Error) -> Self {
        DisplayError::Io(err)
    }
}
