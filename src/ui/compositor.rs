//! Software window and text layer store
//!
//! Hands out opaque handles for windows and text layers and renders the
//! window on top of the stack to any `DrawTarget`.

use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::{Rgb565, RgbColor},
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};
use embedded_text::{
    alignment::VerticalAlignment,
    style::{HeightMode, TextBoxStyleBuilder, VerticalOverdraw},
    TextBox,
};

use super::{ArticleText, TextStyle};
use crate::platform::{Error, LayerHandle, WindowHandle};

pub const MAX_WINDOWS: usize = 2;
pub const MAX_LAYERS: usize = 4;

const WINDOW_BACKGROUND: Rgb565 = Rgb565::WHITE;

/// Layer text storage, same size as the longest article title buffer
type LayerText = ArticleText;

struct WindowSlot {
    /// Attached layers in drawing order
    children: [Option<u8>; MAX_LAYERS],
}

struct LayerSlot {
    frame: Rectangle,
    style: TextStyle,
    text: LayerText,
    parent: Option<u8>,
}

impl LayerSlot {
    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if let Some(background) = self.style.background {
            self.frame
                .into_styled(PrimitiveStyle::with_fill(background))
                .draw(target)?;
        }

        let character_style = MonoTextStyle::new(self.style.font.mono_font(), self.style.text_color);
        let textbox_style = TextBoxStyleBuilder::new()
            .height_mode(HeightMode::Exact(VerticalOverdraw::Hidden))
            .alignment(self.style.alignment.into())
            .vertical_alignment(VerticalAlignment::Top)
            .build();

        TextBox::with_textbox_style(self.text.as_str(), self.frame, character_style, textbox_style)
            .draw(target)?;

        Ok(())
    }
}

/// Windows and text layers backed by fixed tables
pub struct Compositor {
    bounds: Rectangle,
    windows: [Option<WindowSlot>; MAX_WINDOWS],
    layers: [Option<LayerSlot>; MAX_LAYERS],
    /// Window stack, bottom first
    stack: [Option<u8>; MAX_WINDOWS],
    dirty: bool,
}

impl Compositor {
    /// Create a compositor for a screen of the given size
    pub fn new(size: Size) -> Self {
        Self {
            bounds: Rectangle::new(Point::zero(), size),
            windows: core::array::from_fn(|_| None),
            layers: core::array::from_fn(|_| None),
            stack: [None; MAX_WINDOWS],
            dirty: false,
        }
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    pub fn create_window(&mut self) -> Result<WindowHandle, Error> {
        let index = free_slot(&self.windows)?;
        self.windows[index] = Some(WindowSlot {
            children: [None; MAX_LAYERS],
        });
        Ok(WindowHandle::from_raw(index as u8))
    }

    pub fn destroy_window(&mut self, window: WindowHandle) -> Result<(), Error> {
        let index = window.raw();
        let slot = self.windows.get_mut(index as usize).and_then(Option::take);
        let slot = slot.ok_or(Error::InvalidHandle)?;

        for child in slot.children.iter().flatten() {
            if let Some(layer) = self.layers[*child as usize].as_mut() {
                layer.parent = None;
            }
        }
        self.remove_from_stack(index);
        self.dirty = true;
        Ok(())
    }

    /// Show `window` on top of the stack, moving it there if already pushed
    pub fn push_window(&mut self, window: WindowHandle) -> Result<(), Error> {
        self.window_mut(window)?;
        self.remove_from_stack(window.raw());
        let index = free_slot(&self.stack)?;
        self.stack[index] = Some(window.raw());
        self.dirty = true;
        Ok(())
    }

    /// Window currently on top of the stack
    pub fn top_window(&self) -> Option<WindowHandle> {
        self.stack
            .iter()
            .rev()
            .flatten()
            .next()
            .map(|index| WindowHandle::from_raw(*index))
    }

    pub fn create_text_layer(
        &mut self,
        frame: Rectangle,
        style: TextStyle,
    ) -> Result<LayerHandle, Error> {
        let index = free_slot(&self.layers)?;
        self.layers[index] = Some(LayerSlot {
            frame,
            style,
            text: LayerText::new(),
            parent: None,
        });
        Ok(LayerHandle::from_raw(index as u8))
    }

    pub fn destroy_text_layer(&mut self, layer: LayerHandle) -> Result<(), Error> {
        let slot = self
            .layers
            .get_mut(layer.raw() as usize)
            .and_then(Option::take)
            .ok_or(Error::InvalidHandle)?;

        if let Some(parent) = slot.parent {
            if let Some(window) = self.windows[parent as usize].as_mut() {
                for child in window.children.iter_mut() {
                    if *child == Some(layer.raw()) {
                        *child = None;
                    }
                }
            }
            self.dirty = true;
        }
        Ok(())
    }

    /// Attach `layer` to `window`, on top of the window's other layers
    pub fn add_child(&mut self, window: WindowHandle, layer: LayerHandle) -> Result<(), Error> {
        let parent = self.layer(layer)?.parent;
        if parent.is_some() {
            // Layers belong to one window at a time
            return Err(Error::InvalidHandle);
        }

        let children = &mut self.window_mut(window)?.children;
        let index = free_slot(children)?;
        children[index] = Some(layer.raw());

        self.layer_mut(layer)?.parent = Some(window.raw());
        self.dirty = true;
        Ok(())
    }

    /// Replace the layer text, truncating to the layer capacity
    pub fn set_text(&mut self, layer: LayerHandle, text: &str) -> Result<(), Error> {
        let slot = self.layer_mut(layer)?;
        if slot.text.as_str() != text {
            slot.text.set(text);
            self.dirty = true;
        }
        Ok(())
    }

    pub fn text(&self, layer: LayerHandle) -> Result<&str, Error> {
        Ok(self.layer(layer)?.text.as_str())
    }

    pub fn frame(&self, layer: LayerHandle) -> Result<Rectangle, Error> {
        Ok(self.layer(layer)?.frame)
    }

    /// Number of live windows and layers
    pub fn live_objects(&self) -> (usize, usize) {
        (
            self.windows.iter().flatten().count(),
            self.layers.iter().flatten().count(),
        )
    }

    /// Whether anything changed since the last draw
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Draw the top window and its layers
    pub fn draw<D>(&mut self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let window = self
            .top_window()
            .and_then(|window| self.windows[window.raw() as usize].as_ref());

        match window {
            Some(window) => {
                self.bounds
                    .into_styled(PrimitiveStyle::with_fill(WINDOW_BACKGROUND))
                    .draw(target)?;
                for child in window.children.iter().flatten() {
                    if let Some(layer) = self.layers[*child as usize].as_ref() {
                        layer.draw(target)?;
                    }
                }
            }
            None => {
                self.bounds
                    .into_styled(PrimitiveStyle::with_fill(Rgb565::BLACK))
                    .draw(target)?;
            }
        }

        self.dirty = false;
        Ok(())
    }

    fn window_mut(&mut self, window: WindowHandle) -> Result<&mut WindowSlot, Error> {
        self.windows
            .get_mut(window.raw() as usize)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle)
    }

    fn layer(&self, layer: LayerHandle) -> Result<&LayerSlot, Error> {
        self.layers
            .get(layer.raw() as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidHandle)
    }

    fn layer_mut(&mut self, layer: LayerHandle) -> Result<&mut LayerSlot, Error> {
        self.layers
            .get_mut(layer.raw() as usize)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle)
    }

    fn remove_from_stack(&mut self, index: u8) {
        let mut kept = [None; MAX_WINDOWS];
        for (slot, entry) in kept
            .iter_mut()
            .zip(self.stack.iter().flatten().filter(|entry| **entry != index))
        {
            *slot = Some(*entry);
        }
        self.stack = kept;
    }
}

fn free_slot<T>(slots: &[Option<T>]) -> Result<usize, Error> {
    slots
        .iter()
        .position(Option::is_none)
        .ok_or(Error::OutOfResources)
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::*;
    use crate::ui::Font;

    const SIZE: Size = Size::new(240, 240);

    /// In-memory framebuffer
    struct FrameBuffer {
        pixels: Vec<Rgb565>,
    }

    impl FrameBuffer {
        fn new() -> Self {
            Self {
                pixels: vec![Rgb565::RED; (SIZE.width * SIZE.height) as usize],
            }
        }

        fn count(&self, area: Rectangle, color: Rgb565) -> usize {
            area.points()
                .filter(|p| self.pixels[(p.y as u32 * SIZE.width + p.x as u32) as usize] == color)
                .count()
        }
    }

    impl OriginDimensions for FrameBuffer {
        fn size(&self) -> Size {
            SIZE
        }
    }

    impl DrawTarget for FrameBuffer {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if self.bounding_box().contains(point) {
                    self.pixels[(point.y as u32 * SIZE.width + point.x as u32) as usize] = color;
                }
            }
            Ok(())
        }
    }

    fn frame(top: i32) -> Rectangle {
        Rectangle::new(Point::new(0, top), Size::new(240, 50))
    }

    #[test]
    fn draws_text_inside_layer_frame() {
        let mut compositor = Compositor::new(SIZE);
        let window = compositor.create_window().unwrap();
        let layer = compositor
            .create_text_layer(frame(40), TextStyle::centered(Font::Clock))
            .unwrap();
        compositor.add_child(window, layer).unwrap();
        compositor.push_window(window).unwrap();
        compositor.set_text(layer, "10:00").unwrap();
        assert!(compositor.is_dirty());

        let mut fb = FrameBuffer::new();
        compositor.draw(&mut fb).unwrap();
        assert!(!compositor.is_dirty());

        assert!(fb.count(frame(40), Rgb565::BLACK) > 0);
        assert_eq!(fb.count(frame(150), Rgb565::BLACK), 0);
        assert_eq!(fb.count(compositor.bounds(), Rgb565::RED), 0);

        compositor.set_text(layer, "").unwrap();
        compositor.draw(&mut fb).unwrap();
        assert_eq!(fb.count(frame(40), Rgb565::BLACK), 0);
    }

    #[test]
    fn unchanged_text_keeps_compositor_clean() {
        let mut compositor = Compositor::new(SIZE);
        let layer = compositor
            .create_text_layer(frame(0), TextStyle::centered(Font::Body))
            .unwrap();
        compositor.set_text(layer, "Louvre").unwrap();
        compositor.draw(&mut FrameBuffer::new()).unwrap();
        compositor.set_text(layer, "Louvre").unwrap();
        assert!(!compositor.is_dirty());
        assert_eq!(compositor.text(layer), Ok("Louvre"));
    }

    #[test]
    fn tables_are_bounded() {
        let mut compositor = Compositor::new(SIZE);
        for _ in 0..MAX_LAYERS {
            compositor
                .create_text_layer(frame(0), TextStyle::centered(Font::Body))
                .unwrap();
        }
        assert_eq!(
            compositor.create_text_layer(frame(0), TextStyle::centered(Font::Body)),
            Err(Error::OutOfResources)
        );
        assert_eq!(compositor.live_objects(), (0, MAX_LAYERS));
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut compositor = Compositor::new(SIZE);
        let window = compositor.create_window().unwrap();
        let layer = compositor
            .create_text_layer(frame(0), TextStyle::centered(Font::Body))
            .unwrap();
        compositor.add_child(window, layer).unwrap();
        assert_eq!(compositor.add_child(window, layer), Err(Error::InvalidHandle));

        compositor.destroy_text_layer(layer).unwrap();
        assert_eq!(compositor.set_text(layer, "x"), Err(Error::InvalidHandle));
        assert_eq!(compositor.destroy_text_layer(layer), Err(Error::InvalidHandle));

        compositor.push_window(window).unwrap();
        compositor.destroy_window(window).unwrap();
        assert_eq!(compositor.top_window(), None);
        assert_eq!(compositor.destroy_window(window), Err(Error::InvalidHandle));
        assert_eq!(
            compositor.destroy_window(WindowHandle::from_raw(200)),
            Err(Error::InvalidHandle)
        );
        assert_eq!(compositor.live_objects(), (0, 0));
    }

    #[test]
    fn push_moves_window_to_top() {
        let mut compositor = Compositor::new(SIZE);
        let first = compositor.create_window().unwrap();
        let second = compositor.create_window().unwrap();
        compositor.push_window(first).unwrap();
        compositor.push_window(second).unwrap();
        assert_eq!(compositor.top_window(), Some(second));
        compositor.push_window(first).unwrap();
        assert_eq!(compositor.top_window(), Some(first));
        compositor.destroy_window(first).unwrap();
        assert_eq!(compositor.top_window(), Some(second));
    }
}
