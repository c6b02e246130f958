/*
 *  lib.rs
 *
 *  paperframe - battery e-paper picture frame node
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

//! Battery e-paper picture frame node: wake, fetch a pre-rendered 4bpp
//! raster over HTTP, stream it to the panel in fixed-height bands,
//! overlay battery state, present, and power down until the next cycle.

pub mod band;
pub mod battery;
pub mod config;
pub mod display;
pub mod fetch;
pub mod net;
pub mod power;
pub mod scheduler;
pub mod timesync;
