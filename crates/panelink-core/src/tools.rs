//! Tool dispatch: exactly one tool is the pointer-event target.
//!
//! The controller owns the engines, the camera and the input state,
//! converts screen events to world coordinates and routes them to the
//! active tool. Intents the core cannot resolve itself (opening a text
//! editor) are queued for the host to drain.

use crate::backend::RenderBackend;
use crate::bubble::{BubbleHandle, BubbleId, BubbleShapeEngine};
use crate::camera::Camera;
use crate::engines::{BrushEngine, DrawContext, EraserEngine, PenEngine};
use crate::input::{InputState, KeyEvent, MouseButton, PointerEvent};
use crate::stroke::{DrawingPoint, LayerId};
use crate::surface::CanvasSurfaces;
use crate::texture_cache::TextureCache;
use crate::transformer::{GizmoState, TransformGizmo};
use kurbo::Point;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Size change per bracket-key press, in world pixels.
const SIZE_ADJUST_STEP: f64 = 2.0;

/// Scroll-to-zoom sensitivity per scroll unit.
const ZOOM_STEP: f64 = 0.0015;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Brush,
    Eraser,
    Pen,
    Bubble,
    Transform,
    Select,
    Text,
}

/// A request the host must resolve outside the core.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolIntent {
    /// Double-click on a bubble: open its text editor.
    EditBubbleText(BubbleId),
    /// Text tool click: place a text entry at a world position.
    PlaceText(Point),
}

/// What the pointer grabbed on a bubble at pointer-down.
#[derive(Debug, Clone, Copy, PartialEq)]
enum BubbleDrag {
    Handle(BubbleHandle),
    Move(BubbleId),
}

/// Routes pointer and keyboard events to the active tool.
pub struct ToolController {
    tool: ToolKind,
    pub brush: BrushEngine,
    pub eraser: EraserEngine,
    pub pen: PenEngine,
    pub bubbles: BubbleShapeEngine,
    pub gizmo: TransformGizmo,
    pub camera: Camera,
    pub input: InputState,
    tip_cache: TextureCache,
    pen_cache: TextureCache,
    active_layer: Option<LayerId>,
    bubble_drag: Option<BubbleDrag>,
    last_world: Point,
    last_screen: Point,
    pending_intent: Option<ToolIntent>,
    epoch: Instant,
}

impl Default for ToolController {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolController {
    pub fn new() -> Self {
        Self {
            tool: ToolKind::default(),
            brush: BrushEngine::default(),
            eraser: EraserEngine::default(),
            pen: PenEngine::default(),
            bubbles: BubbleShapeEngine::new(),
            gizmo: TransformGizmo::new(),
            camera: Camera::default(),
            input: InputState::new(),
            tip_cache: TextureCache::for_tips(),
            pen_cache: TextureCache::for_pen(),
            active_layer: None,
            bubble_drag: None,
            last_world: Point::ZERO,
            last_screen: Point::ZERO,
            pending_intent: None,
            epoch: Instant::now(),
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Switch tools, finishing whatever the previous tool had in
    /// flight: in-progress strokes are ended normally and an active
    /// gizmo commits its transform.
    pub fn set_tool(
        &mut self,
        tool: ToolKind,
        backend: &mut dyn RenderBackend,
        surfaces: &mut CanvasSurfaces,
    ) {
        if tool == self.tool {
            return;
        }
        match self.tool {
            ToolKind::Brush => {
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.tip_cache,
                };
                self.brush.end_stroke(&mut ctx);
            }
            ToolKind::Eraser => {
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.tip_cache,
                };
                self.eraser.end_stroke(&mut ctx);
            }
            ToolKind::Pen => {
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.pen_cache,
                };
                self.pen.end_stroke(&mut ctx);
            }
            ToolKind::Transform => self.gizmo.deactivate(surfaces),
            ToolKind::Bubble | ToolKind::Select | ToolKind::Text => {}
        }
        self.bubble_drag = None;
        self.tool = tool;
    }

    /// Select the layer strokes and transforms apply to.
    pub fn set_active_layer(&mut self, layer: Option<LayerId>) {
        self.active_layer = layer;
        self.brush.set_active_layer(layer);
        self.eraser.set_active_layer(layer);
        self.pen.set_active_layer(layer);
    }

    pub fn active_layer(&self) -> Option<LayerId> {
        self.active_layer
    }

    /// Take the queued host intent, if any.
    pub fn take_intent(&mut self) -> Option<ToolIntent> {
        self.pending_intent.take()
    }

    /// Destroy every backend resource the controller holds.
    pub fn cleanup(&mut self, backend: &mut dyn RenderBackend, surfaces: &mut CanvasSurfaces) {
        let mut ctx = DrawContext {
            backend: &mut *backend,
            surfaces,
            cache: &mut self.pen_cache,
        };
        self.pen.cleanup(&mut ctx);
        self.brush.cleanup();
        self.eraser.cleanup();
        self.gizmo.cancel();
        self.bubble_drag = None;
        self.tip_cache.clear(backend);
        self.pen_cache.clear(backend);
    }

    /// Route a pointer event to the active tool.
    pub fn handle_pointer_event(
        &mut self,
        event: PointerEvent,
        backend: &mut dyn RenderBackend,
        surfaces: &mut CanvasSurfaces,
    ) {
        self.input.handle_pointer_event(event.clone());
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
                ..
            } => self.pointer_down(position, backend, surfaces),
            PointerEvent::Move { position, .. } => self.pointer_move(position, backend, surfaces),
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            } => self.pointer_up(backend, surfaces),
            PointerEvent::Scroll { position, delta } => {
                let anchor = self.camera.screen_to_world(position);
                let factor = (-delta.y * ZOOM_STEP).exp();
                self.camera.zoom_at(anchor, self.camera.zoom * factor);
            }
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => {}
        }
    }

    /// Route a key event. Bracket keys resize the active drawing tool,
    /// Enter commits the gizmo, Escape cancels the current interaction,
    /// Delete removes the selected bubble.
    pub fn handle_key_event(
        &mut self,
        event: KeyEvent,
        backend: &mut dyn RenderBackend,
        surfaces: &mut CanvasSurfaces,
    ) {
        self.input.handle_key_event(event.clone());
        let KeyEvent::Pressed(key) = event else {
            return;
        };
        match key.as_str() {
            "[" => self.adjust_active_size(-SIZE_ADJUST_STEP),
            "]" => self.adjust_active_size(SIZE_ADJUST_STEP),
            "Enter" => {
                if self.tool == ToolKind::Transform {
                    self.gizmo.deactivate(surfaces);
                }
            }
            "Escape" => self.cancel_interaction(backend, surfaces),
            "Delete" | "Backspace" => {
                if self.tool == ToolKind::Bubble {
                    if let Some(id) = self.bubbles.selected() {
                        self.bubbles.remove(id);
                    }
                }
            }
            _ => {}
        }
    }

    fn adjust_active_size(&mut self, delta: f64) {
        match self.tool {
            ToolKind::Brush => self.brush.params_mut().adjust_radius(delta),
            ToolKind::Eraser => self.eraser.params_mut().adjust_size(delta),
            ToolKind::Pen => self.pen.params_mut().adjust_size(delta),
            _ => {}
        }
    }

    /// Abandon the current interaction without recording it.
    fn cancel_interaction(
        &mut self,
        backend: &mut dyn RenderBackend,
        surfaces: &mut CanvasSurfaces,
    ) {
        match self.tool {
            ToolKind::Brush => self.brush.cleanup(),
            ToolKind::Eraser => self.eraser.cleanup(),
            ToolKind::Pen => {
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.pen_cache,
                };
                self.pen.cleanup(&mut ctx);
            }
            ToolKind::Bubble => {
                self.bubble_drag = None;
                self.bubbles.select(None);
            }
            ToolKind::Transform => self.gizmo.cancel(),
            ToolKind::Select | ToolKind::Text => {}
        }
    }

    fn sample(&self, world: Point) -> DrawingPoint {
        DrawingPoint::new(world.x, world.y, self.input.pressure, self.timestamp())
    }

    fn timestamp(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    fn pointer_down(
        &mut self,
        position: Point,
        backend: &mut dyn RenderBackend,
        surfaces: &mut CanvasSurfaces,
    ) {
        let world = self.camera.screen_to_world(position);
        self.last_world = world;
        self.last_screen = position;

        match self.tool {
            ToolKind::Brush => {
                let point = self.sample(world);
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.tip_cache,
                };
                self.brush.start_stroke(point, &mut ctx);
            }
            ToolKind::Eraser => {
                let point = self.sample(world);
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.tip_cache,
                };
                self.eraser.start_stroke(point, &mut ctx);
            }
            ToolKind::Pen => {
                let point = self.sample(world);
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.pen_cache,
                };
                self.pen.start_stroke(point, &mut ctx);
            }
            ToolKind::Bubble => {
                if self.input.is_double_click() {
                    if let Some(id) = self.bubbles.select_at(world) {
                        self.pending_intent = Some(ToolIntent::EditBubbleText(id));
                    }
                    return;
                }
                if let Some(handle) = self.bubbles.handle_at(world) {
                    self.bubble_drag = Some(BubbleDrag::Handle(handle));
                } else if let Some(id) = self.bubbles.select_at(world) {
                    self.bubble_drag = Some(BubbleDrag::Move(id));
                }
            }
            ToolKind::Transform => {
                if !self.gizmo.is_active() {
                    if let Some(layer) = self.active_layer {
                        self.gizmo.activate(surfaces, layer);
                    }
                }
                self.gizmo.pointer_down(world);
            }
            ToolKind::Select => {}
            ToolKind::Text => {
                self.pending_intent = Some(ToolIntent::PlaceText(world));
            }
        }
    }

    fn pointer_move(
        &mut self,
        position: Point,
        backend: &mut dyn RenderBackend,
        surfaces: &mut CanvasSurfaces,
    ) {
        let world = self.camera.screen_to_world(position);
        let world_delta = world - self.last_world;
        let screen_delta = position - self.last_screen;

        match self.tool {
            ToolKind::Brush => {
                if self.brush.is_drawing() {
                    let point = self.sample(world);
                    let mut ctx = DrawContext {
                        backend,
                        surfaces,
                        cache: &mut self.tip_cache,
                    };
                    self.brush.continue_stroke(point, &mut ctx);
                }
            }
            ToolKind::Eraser => {
                if self.eraser.is_drawing() {
                    let point = self.sample(world);
                    let mut ctx = DrawContext {
                        backend,
                        surfaces,
                        cache: &mut self.tip_cache,
                    };
                    self.eraser.continue_stroke(point, &mut ctx);
                }
            }
            ToolKind::Pen => {
                if self.pen.is_drawing() {
                    let point = self.sample(world);
                    let mut ctx = DrawContext {
                        backend,
                        surfaces,
                        cache: &mut self.pen_cache,
                    };
                    self.pen.continue_stroke(point, &mut ctx);
                }
            }
            ToolKind::Bubble => match self.bubble_drag {
                Some(BubbleDrag::Handle(BubbleHandle::Resize(handle))) => {
                    if let Some(id) = self.bubbles.selected() {
                        self.bubbles.resize(id, handle, world_delta.x, world_delta.y);
                    }
                }
                Some(BubbleDrag::Handle(BubbleHandle::Tail)) => {
                    if let Some(id) = self.bubbles.selected() {
                        self.bubbles.drag_tail(id, world);
                    }
                }
                Some(BubbleDrag::Move(id)) => {
                    self.bubbles.move_by(id, world_delta.x, world_delta.y);
                }
                None => {}
            },
            ToolKind::Transform => {
                if self.gizmo.state() == GizmoState::Rotating && self.input.modifiers.shift {
                    self.gizmo.rotate_to(world, true);
                } else {
                    self.gizmo.pointer_move(world);
                }
            }
            ToolKind::Select => {
                if self.input.is_dragging {
                    self.camera.pan_by(screen_delta);
                }
            }
            ToolKind::Text => {}
        }

        self.last_world = self.camera.screen_to_world(position);
        self.last_screen = position;
    }

    fn pointer_up(&mut self, backend: &mut dyn RenderBackend, surfaces: &mut CanvasSurfaces) {
        match self.tool {
            ToolKind::Brush => {
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.tip_cache,
                };
                self.brush.end_stroke(&mut ctx);
            }
            ToolKind::Eraser => {
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.tip_cache,
                };
                self.eraser.end_stroke(&mut ctx);
            }
            ToolKind::Pen => {
                let mut ctx = DrawContext {
                    backend,
                    surfaces,
                    cache: &mut self.pen_cache,
                };
                self.pen.end_stroke(&mut ctx);
            }
            ToolKind::Bubble => self.bubble_drag = None,
            ToolKind::Transform => self.gizmo.pointer_up(),
            ToolKind::Select | ToolKind::Text => {}
        }
    }
}
