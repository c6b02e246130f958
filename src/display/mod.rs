/*
 *  display/mod.rs
 *
 *  paperframe - battery e-paper picture frame node
 *
 *  Display subsystem - sink boundary, packed framebuffer, bench sink
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

pub mod emulator;
pub mod error;
pub mod frame;
pub mod traits;

// Re-exports for convenience
pub use emulator::EmulatorSink;
pub use error::DisplayError;
pub use frame::Frame4;
pub use traits::DisplaySink;
