// IVec2 <-> Boxed<Rectangle> conversions.

use glam::{I64Vec2, IVec2};
use glimmer_ffi::abi::NativeRectangle;
use glimmer_runtime::{Boxed, GlimmerResult};

use crate::boxed::Rectangle;

pub trait RectangleExt {
    fn origin(&self) -> IVec2;
    fn size(&self) -> IVec2;
    fn set_origin(&mut self, origin: IVec2);
    /// Half-open: the right and bottom edges are outside.
    fn contains(&self, point: IVec2) -> bool;
}

impl RectangleExt for Boxed<Rectangle> {
    fn origin(&self) -> IVec2 {
        let r = self.as_ref();
        IVec2::new(r.x, r.y)
    }

    fn size(&self) -> IVec2 {
        let r = self.as_ref();
        IVec2::new(r.width, r.height)
    }

    fn set_origin(&mut self, origin: IVec2) {
        let r = self.get_mut();
        r.x = origin.x;
        r.y = origin.y;
    }

    fn contains(&self, point: IVec2) -> bool {
        // Widened so rectangles reaching past i32::MAX cannot overflow.
        let offset = point.as_i64vec2() - self.origin().as_i64vec2();
        offset.cmpge(I64Vec2::ZERO).all() && offset.cmplt(self.size().as_i64vec2()).all()
    }
}

impl Rectangle {
    pub fn from_origin_size(origin: IVec2, size: IVec2) -> GlimmerResult<Boxed<Rectangle>> {
        Boxed::new(NativeRectangle {
            x: origin.x,
            y: origin.y,
            width: size.x,
            height: size.y,
        })
    }
}
